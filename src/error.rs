//! Error taxonomy for the calibration engine
//!
//! Configuration problems are fatal at load time, completeness violations
//! are fatal per call. Scoring gaps (unknown chain signatures, weak documents)
//! are not errors: they degrade to low scores with itemized reasons.

use crate::models::LayerId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration or calibrating a method
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Configuration integrity violation in {table}: {message}")]
    ConfigurationIntegrity { table: String, message: String },

    #[error(
        "Completeness violation for method '{method_id}' (role {role}): missing layers [{}]",
        format_layers(.missing)
    )]
    CompletenessViolation {
        method_id: String,
        role: String,
        missing: Vec<LayerId>,
    },

    #[error("No chain signature registered for method '{method_id}'")]
    UnknownMethodSignature { method_id: String },

    #[error("Failed to parse {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CalibrationError {
    pub(crate) fn integrity(table: impl Into<String>, message: impl Into<String>) -> Self {
        CalibrationError::ConfigurationIntegrity {
            table: table.into(),
            message: message.into(),
        }
    }
}

fn format_layers(layers: &[LayerId]) -> String {
    layers
        .iter()
        .map(|l| l.symbol())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type CalResult<T> = Result<T, CalibrationError>;
