//! layercal - Multi-layer method calibration
//!
//! Scores how trustworthy a pipeline method's output is. Each method has a
//! role; the role decides which evidence layers must be evaluated, and the
//! layer scores are fused into one bounded score with a per-role
//! Choquet-style capacity.
//!
//! ```text
//! CalibrationSubject ──► resolve role ──► evaluate layers ──► completeness ──► fuse
//!                        (resolver)       (layers::*)         (orchestrator)   (scoring)
//! ```
//!
//! Configuration is loaded once from a directory and shared read-only:
//!
//! ```no_run
//! use std::sync::Arc;
//! use layercal::{load_calibration_config, CalibrationOrchestrator, CalibrationSubject, EvidenceStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Arc::new(load_calibration_config(std::path::Path::new("./calibration"))?);
//! let orchestrator = CalibrationOrchestrator::new(config)?;
//! let result = orchestrator.calibrate(&CalibrationSubject::new("Scorer.score"), &EvidenceStore::default())?;
//! println!("{:.3}", result.final_score);
//! # Ok(())
//! # }
//! ```

pub mod calibrate;
pub mod cli;
pub mod config;
pub mod error;
pub mod layers;
pub mod models;
pub mod reporters;
pub mod scoring;

pub use calibrate::{CalibrationOrchestrator, LayerRequirementsResolver, RoleResolution};
pub use config::{load_calibration_config, CalibrationConfig, CalibrationParameters};
pub use error::{CalResult, CalibrationError};
pub use layers::{CompatibilityRegistry, LayerEvaluator};
pub use models::{
    CalibrationResult, CalibrationSubject, ChainSequenceReport, EvidenceStore, LayerId, RoleTag,
};
pub use scoring::ChoquetAggregator;
