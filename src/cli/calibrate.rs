//! `layercal calibrate`

use super::load_config;
use crate::calibrate::CalibrationOrchestrator;
use crate::models::{CalibrationSubject, EvidenceStore, RoleTag};
use crate::reporters::{self, OutputFormat};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Parse a `--role` value
pub(super) fn parse_role(role: Option<&str>) -> Result<Option<RoleTag>> {
    role.map(|r| RoleTag::from_str(r).map_err(|e| anyhow!(e)))
        .transpose()
}

/// Read an evidence file, or start from empty evidence
pub(super) fn read_evidence(path: Option<&Path>) -> Result<EvidenceStore> {
    let Some(path) = path else {
        return Ok(EvidenceStore::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read evidence file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid evidence JSON in {}", path.display()))
}

pub fn run(
    config_dir: &Path,
    method: &str,
    role: Option<&str>,
    evidence: Option<&Path>,
    format: &str,
) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let config = Arc::new(load_config(config_dir)?);
    let orchestrator = CalibrationOrchestrator::new(config)?;

    let mut subject = CalibrationSubject::new(method);
    subject.role = parse_role(role)?;
    let evidence = read_evidence(evidence)?;

    let result = orchestrator
        .calibrate(&subject, &evidence)
        .with_context(|| format!("Calibration of '{}' failed", method))?;

    println!("{}", reporters::report_calibration(&result, format)?);
    Ok(())
}
