//! `layercal batch`

use super::load_config;
use crate::calibrate::CalibrationOrchestrator;
use crate::models::{CalibrationSubject, EvidenceStore};
use crate::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use console::style;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct BatchItem {
    subject: CalibrationSubject,
    #[serde(default)]
    evidence: EvidenceStore,
}

pub fn run(config_dir: &Path, file: &Path, format: &str) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let items: Vec<BatchItem> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid batch JSON in {}", file.display()))?;

    let orchestrator = CalibrationOrchestrator::new(Arc::new(load_config(config_dir)?))?;
    let pairs: Vec<(CalibrationSubject, EvidenceStore)> = items
        .into_iter()
        .map(|item| (item.subject, item.evidence))
        .collect();
    let results = orchestrator.calibrate_batch(&pairs);
    let failures = results.iter().filter(|r| r.is_err()).count();

    match format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = pairs
                .iter()
                .zip(&results)
                .map(|((subject, _), result)| match result {
                    Ok(r) => serde_json::json!({ "method_id": subject.method_id, "result": r }),
                    Err(e) => serde_json::json!({ "method_id": subject.method_id, "error": e.to_string() }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for ((subject, _), result) in pairs.iter().zip(&results) {
                match result {
                    Ok(r) => println!("{}", reporters::report_calibration(r, format)?),
                    Err(e) => println!(
                        "\n{} {}: {}\n",
                        style("✗").red(),
                        style(&subject.method_id).bold(),
                        e
                    ),
                }
            }
            println!(
                "{} calibrated, {} failed",
                style(results.len() - failures).green(),
                style(failures).red()
            );
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} calibrations failed", failures, results.len());
    }
    Ok(())
}
