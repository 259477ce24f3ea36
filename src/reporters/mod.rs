//! Output reporters for calibration results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::models::{CalibrationResult, ChainSequenceReport};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a calibration result in the given format
pub fn report_calibration(result: &CalibrationResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_calibration(result)),
        OutputFormat::Json => json::render(result),
    }
}

/// Render a chain sequence report in the given format
pub fn report_chain(report: &ChainSequenceReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_chain(report)),
        OutputFormat::Json => json::render(report),
    }
}
