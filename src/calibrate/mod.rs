//! Calibration pipeline
//!
//! - `resolver`: role and required-layer resolution
//! - `orchestrator`: resolve, evaluate, validate completeness, aggregate

mod orchestrator;
mod resolver;

pub use orchestrator::{layer_detail, CalibrationOrchestrator, CalibrationStage};
pub use resolver::{infer_role_from_name, LayerRequirementsResolver, RoleResolution};
