//! `layercal chain`

use super::load_config;
use crate::calibrate::CalibrationOrchestrator;
use crate::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

fn read_declared_outputs(path: Option<&Path>) -> Result<BTreeMap<String, Vec<String>>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read outputs file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid outputs JSON in {}", path.display()))
}

pub fn run(
    config_dir: &Path,
    methods: &[String],
    inputs: &[String],
    outputs: Option<&Path>,
    format: &str,
) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let orchestrator = CalibrationOrchestrator::new(Arc::new(load_config(config_dir)?))?;

    let methods: Vec<String> = methods
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    let initial: BTreeSet<String> = inputs
        .iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    let declared = read_declared_outputs(outputs)?;

    let report = orchestrator.evaluate_chain_sequence(&methods, &initial, &declared);
    println!("{}", reporters::report_chain(&report, format)?);
    Ok(())
}
