//! `layercal layers` and `layercal check-config`

use super::calibrate::parse_role;
use super::load_config;
use crate::calibrate::CalibrationOrchestrator;
use crate::models::CalibrationSubject;
use crate::reporters::OutputFormat;
use anyhow::Result;
use console::style;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub fn layers(config_dir: &Path, method: &str, role: Option<&str>, format: &str) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let orchestrator = CalibrationOrchestrator::new(Arc::new(load_config(config_dir)?))?;

    let mut subject = CalibrationSubject::new(method);
    subject.role = parse_role(role)?;
    let resolution = orchestrator.resolve(&subject);

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "method_id": method,
                "role": resolution.role,
                "role_source": resolution.source,
                "layers": resolution.layers,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            let symbols: Vec<&str> = resolution.layers.iter().map(|l| l.symbol()).collect();
            println!("Method:  {}", method);
            println!(
                "Role:    {} ({:?})",
                resolution.role_label(),
                resolution.source
            );
            println!("Layers:  {} [{}]", symbols.len(), symbols.join(", "));
        }
    }
    Ok(())
}

pub fn check_config(config_dir: &Path) -> Result<()> {
    let orchestrator = CalibrationOrchestrator::new(Arc::new(load_config(config_dir)?))?;
    let config = orchestrator.config();

    println!(
        "{} Configuration valid: {}",
        style("✓").green(),
        style(config_dir.display()).cyan()
    );
    println!("  intrinsic:     {} methods", config.intrinsic.len());
    println!("  compatibility: {} methods", config.compatibility.len());
    println!("  signatures:    {} methods", config.signatures.len());
    println!("  catalog:       {} methods", config.catalog.len());
    println!(
        "  strict chain signatures: {}",
        config.parameters.chain.strict_signatures
    );
    println!("  fingerprint:   {}", orchestrator.fingerprint());
    Ok(())
}
