//! Configuration module for layercal
//!
//! This module handles:
//! - The parameter file (`calibration.toml`)
//! - The four read-only method tables
//! - Role-specific fusion weights
//! - Load-time integrity checks and the configuration fingerprint

mod calibration_config;
mod fusion;
mod tables;

pub use calibration_config::{
    load_calibration_config, BaseWeights, CalibrationConfig, CalibrationParameters, ChainParams,
    SectionRequirement, UnitLayerParams, CATALOG_FILE, COMPATIBILITY_FILE, INTRINSIC_FILE,
    MAX_ANTI_GAMING_PENALTY, PARAMETERS_FILE, SIGNATURES_FILE,
};
pub use fusion::{FusionTable, InteractionWeight, RoleFusionWeights, WEIGHT_SUM_TOLERANCE};
pub use tables::{
    CatalogEntry, CompatibilityMapping, CompatibilityTable, IntrinsicEntry, IntrinsicTable,
    MethodCatalog, MethodSignature, MethodTable, SignatureTable,
};
