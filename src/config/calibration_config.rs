//! Calibration configuration support
//!
//! Loads the parameter file and the four method tables from a single
//! configuration directory:
//!
//! | File | Content |
//! |---|---|
//! | `calibration.toml` | base weights, @u parameters, chain flags, fusion weights |
//! | `intrinsic_calibration.json` | role + @b sub-scores per method |
//! | `method_compatibility.json` | question/dimension/policy scores per method |
//! | `method_signatures.json` | input contracts for @chain |
//! | `method_catalog.json` | congruence and governance values for @C / @m |
//!
//! Every file is optional. A file that exists but fails to parse or validate
//! aborts loading: a calibration must never run against half-read tables.
//!
//! # Parameter file
//!
//! ```toml
//! [base]
//! theory = 0.40
//! implementation = 0.35
//! deployment = 0.25
//!
//! [chain]
//! strict_signatures = true
//!
//! [unit]
//! indicator_gate = 0.7
//! budget_gate = 0.7
//! penalty_cap = 0.3
//!
//! [unit.sections.diagnostico]
//! min_tokens = 500
//! critical = true
//!
//! [fusion.roles.REPORT]
//! linear = { base = 0.35, chain = 0.25, congruence = 0.20, meta = 0.10 }
//! interactions = [{ layers = ["chain", "congruence"], weight = 0.10 }]
//! ```

use super::fusion::{FusionTable, RawFusionConfig};
use super::tables::{
    validate_catalog, validate_intrinsic, validate_signatures, CompatibilityTable,
    IntrinsicTable, MethodCatalog, SignatureTable,
};
use crate::error::{CalResult, CalibrationError};
use crate::layers::CompatibilityRegistry;
use crate::models::IndicatorRow;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

pub const PARAMETERS_FILE: &str = "calibration.toml";
pub const INTRINSIC_FILE: &str = "intrinsic_calibration.json";
pub const COMPATIBILITY_FILE: &str = "method_compatibility.json";
pub const SIGNATURES_FILE: &str = "method_signatures.json";
pub const CATALOG_FILE: &str = "method_catalog.json";

/// Upper bound on the @u anti-gaming penalty; `penalty_cap` may only lower it
pub const MAX_ANTI_GAMING_PENALTY: f64 = 0.3;

/// Weights of the three intrinsic sub-scores in @b
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseWeights {
    #[serde(default = "default_theory_weight")]
    pub theory: f64,
    #[serde(default = "default_implementation_weight")]
    pub implementation: f64,
    #[serde(default = "default_deployment_weight")]
    pub deployment: f64,
}

impl Default for BaseWeights {
    fn default() -> Self {
        Self {
            theory: default_theory_weight(),
            implementation: default_implementation_weight(),
            deployment: default_deployment_weight(),
        }
    }
}

fn default_theory_weight() -> f64 {
    0.40
}
fn default_implementation_weight() -> f64 {
    0.35
}
fn default_deployment_weight() -> f64 {
    0.25
}

impl BaseWeights {
    /// Validate that weights sum to 1.0 (with tolerance)
    pub fn is_valid(&self) -> bool {
        let sum = self.theory + self.implementation + self.deployment;
        (sum - 1.0).abs() < 0.001 && self.theory >= 0.0 && self.implementation >= 0.0 && self.deployment >= 0.0
    }
}

/// @chain behavior flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainParams {
    /// Fail `calibrate` when @chain is required and no signature exists
    #[serde(default = "default_true")]
    pub strict_signatures: bool,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            strict_signatures: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Minimums for one mandatory section of the source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRequirement {
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
    #[serde(default = "default_min_keywords")]
    pub min_keywords: usize,
    #[serde(default = "default_min_numbers")]
    pub min_numbers: usize,
    #[serde(default = "default_min_sources")]
    pub min_sources: usize,
    /// Critical sections weigh 2.0 in M, the rest 1.0
    #[serde(default)]
    pub critical: bool,
}

fn default_min_tokens() -> usize {
    300
}
fn default_min_keywords() -> usize {
    3
}
fn default_min_numbers() -> usize {
    5
}
fn default_min_sources() -> usize {
    1
}

impl SectionRequirement {
    fn new(min_tokens: usize, min_keywords: usize, min_numbers: usize, min_sources: usize, critical: bool) -> Self {
        Self {
            min_tokens,
            min_keywords,
            min_numbers,
            min_sources,
            critical,
        }
    }
}

/// Parameters of the @u layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitLayerParams {
    /// Canonical blocks, in canonical document order
    pub required_blocks: Vec<String>,
    pub sections: BTreeMap<String, SectionRequirement>,
    pub indicator_required_fields: Vec<String>,
    pub min_indicator_rows: usize,
    pub min_ppi_rows: usize,
    pub indicator_gate: f64,
    pub budget_gate: f64,
    pub baseline_year_min: i32,
    pub baseline_year_max: i32,
    /// Relative tolerance between allocation sum and declared total
    pub accounting_tolerance: f64,
    /// Case-insensitive markers treated as "no data"
    pub placeholder_markers: Vec<String>,
    pub penalty_cap: f64,
    /// Penalty per unit of placeholder density, before the cap
    pub penalty_scale: f64,
}

impl Default for UnitLayerParams {
    fn default() -> Self {
        let mut sections = BTreeMap::new();
        sections.insert("diagnostico".to_string(), SectionRequirement::new(500, 5, 10, 3, true));
        sections.insert("estrategica".to_string(), SectionRequirement::new(400, 5, 5, 1, true));
        sections.insert("ppi".to_string(), SectionRequirement::new(200, 3, 20, 1, true));
        sections.insert("seguimiento".to_string(), SectionRequirement::new(150, 3, 3, 1, false));

        Self {
            required_blocks: ["diagnostico", "estrategica", "ppi", "seguimiento"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sections,
            indicator_required_fields: IndicatorRow::FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_indicator_rows: 5,
            min_ppi_rows: 3,
            indicator_gate: 0.7,
            budget_gate: 0.7,
            baseline_year_min: 2019,
            baseline_year_max: 2024,
            accounting_tolerance: 0.01,
            placeholder_markers: ["", "n/a", "s/d", "sin dato"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            penalty_cap: 0.3,
            penalty_scale: 0.5,
        }
    }
}

impl UnitLayerParams {
    fn validate(&self) -> CalResult<()> {
        let unit = |field: &str, v: f64| -> CalResult<()> {
            if !(0.0..=1.0).contains(&v) {
                return Err(CalibrationError::integrity(
                    "unit",
                    format!("{} = {} outside [0, 1]", field, v),
                ));
            }
            Ok(())
        };
        unit("indicator_gate", self.indicator_gate)?;
        unit("budget_gate", self.budget_gate)?;
        unit("penalty_cap", self.penalty_cap)?;
        unit("accounting_tolerance", self.accounting_tolerance)?;
        if self.penalty_cap > MAX_ANTI_GAMING_PENALTY {
            return Err(CalibrationError::integrity(
                "unit",
                format!(
                    "penalty_cap = {} exceeds the maximum anti-gaming penalty {}",
                    self.penalty_cap, MAX_ANTI_GAMING_PENALTY
                ),
            ));
        }
        if self.penalty_scale < 0.0 {
            return Err(CalibrationError::integrity("unit", "penalty_scale must be non-negative"));
        }
        if self.required_blocks.is_empty() {
            return Err(CalibrationError::integrity("unit", "required_blocks is empty"));
        }
        if self.baseline_year_min > self.baseline_year_max {
            return Err(CalibrationError::integrity(
                "unit",
                format!(
                    "baseline year range {}..={} is empty",
                    self.baseline_year_min, self.baseline_year_max
                ),
            ));
        }
        for field in &self.indicator_required_fields {
            if !IndicatorRow::FIELDS.contains(&field.as_str()) {
                return Err(CalibrationError::integrity(
                    "unit",
                    format!("unknown indicator field '{}'", field),
                ));
            }
        }
        Ok(())
    }
}

/// All tunable parameters, as read from `calibration.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationParameters {
    pub base: BaseWeights,
    pub chain: ChainParams,
    pub unit: UnitLayerParams,
    pub fusion: FusionTable,
}

#[derive(Debug, Default, Deserialize)]
struct RawParameters {
    #[serde(default)]
    base: BaseWeights,
    #[serde(default)]
    chain: ChainParams,
    #[serde(default)]
    unit: UnitLayerParams,
    #[serde(default)]
    fusion: RawFusionConfig,
}

impl CalibrationParameters {
    /// Parse the TOML parameter file contents
    pub fn from_toml_str(content: &str) -> CalResult<Self> {
        let raw: RawParameters = toml::from_str(content).map_err(|e| CalibrationError::ConfigParse {
            path: PARAMETERS_FILE.into(),
            message: e.to_string(),
        })?;
        let mut unit = raw.unit;
        // Sections the file does not mention keep their built-in minimums
        for (id, requirement) in UnitLayerParams::default().sections {
            unit.sections.entry(id).or_insert(requirement);
        }
        Ok(Self {
            base: raw.base,
            chain: raw.chain,
            unit,
            fusion: FusionTable::from_raw(raw.fusion)?,
        })
    }
}

/// Complete, immutable configuration for one orchestrator
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationConfig {
    pub parameters: CalibrationParameters,
    pub intrinsic: IntrinsicTable,
    pub compatibility: CompatibilityTable,
    pub signatures: SignatureTable,
    pub catalog: MethodCatalog,
}

impl CalibrationConfig {
    pub fn with_parameters(mut self, parameters: CalibrationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_intrinsic(mut self, table: IntrinsicTable) -> Self {
        self.intrinsic = table;
        self
    }

    pub fn with_compatibility(mut self, table: CompatibilityTable) -> Self {
        self.compatibility = table;
        self
    }

    pub fn with_signatures(mut self, table: SignatureTable) -> Self {
        self.signatures = table;
        self
    }

    pub fn with_catalog(mut self, table: MethodCatalog) -> Self {
        self.catalog = table;
        self
    }

    /// Run every load-time integrity check
    pub fn validate(&self) -> CalResult<()> {
        if !self.parameters.base.is_valid() {
            let b = &self.parameters.base;
            return Err(CalibrationError::integrity(
                "base",
                format!(
                    "weights ({}, {}, {}) must be non-negative and sum to 1.0",
                    b.theory, b.implementation, b.deployment
                ),
            ));
        }
        self.parameters.unit.validate()?;
        self.parameters.fusion.validate()?;
        validate_intrinsic(&self.intrinsic)?;
        validate_signatures(&self.signatures)?;
        validate_catalog(&self.catalog)?;
        CompatibilityRegistry::validate_table(&self.compatibility)?;
        Ok(())
    }

    /// SHA-256 over the canonical JSON form of the whole configuration
    pub fn fingerprint(&self) -> String {
        // BTreeMaps everywhere: serialization order is stable
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }
}

/// Load and validate configuration from a directory.
///
/// Missing files fall back to built-in parameters or empty tables.
pub fn load_calibration_config(dir: &Path) -> CalResult<CalibrationConfig> {
    let parameters_path = dir.join(PARAMETERS_FILE);
    let parameters = if parameters_path.exists() {
        let content = std::fs::read_to_string(&parameters_path)?;
        let params = CalibrationParameters::from_toml_str(&content).map_err(|e| match e {
            CalibrationError::ConfigParse { message, .. } => CalibrationError::ConfigParse {
                path: parameters_path.clone(),
                message,
            },
            other => other,
        })?;
        debug!("Loaded calibration parameters from {}", parameters_path.display());
        params
    } else {
        debug!("No {} found, using built-in parameters", PARAMETERS_FILE);
        CalibrationParameters::default()
    };

    let config = CalibrationConfig {
        parameters,
        intrinsic: load_json_table(&dir.join(INTRINSIC_FILE))?,
        compatibility: load_json_table(&dir.join(COMPATIBILITY_FILE))?,
        signatures: load_json_table(&dir.join(SIGNATURES_FILE))?,
        catalog: load_json_table(&dir.join(CATALOG_FILE))?,
    };
    config.validate()?;

    info!(
        "Calibration config loaded: {} intrinsic, {} compatibility, {} signatures, {} catalog entries",
        config.intrinsic.len(),
        config.compatibility.len(),
        config.signatures.len(),
        config.catalog.len()
    );
    Ok(config)
}

/// Load a JSON table, or its default when the file does not exist
fn load_json_table<T: DeserializeOwned + Default>(path: &Path) -> CalResult<T> {
    if !path.exists() {
        debug!("No table at {}, using empty table", path.display());
        return Ok(T::default());
    }
    let content = std::fs::read_to_string(path)?;
    let table = serde_json::from_str(&content).map_err(|e| CalibrationError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!("Loaded table from {}", path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompatibilityMapping, IntrinsicEntry};

    #[test]
    fn test_default_config_is_valid() {
        let config = CalibrationConfig::default();
        config.validate().expect("defaults must validate");
        assert!(config.parameters.chain.strict_signatures);
        assert_eq!(config.parameters.unit.penalty_cap, 0.3);
    }

    #[test]
    fn test_base_weights_validation() {
        let weights = BaseWeights::default();
        assert!(weights.is_valid());

        let bad = BaseWeights {
            theory: 0.5,
            implementation: 0.5,
            deployment: 0.5,
        };
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_parse_parameters() {
        let toml = r#"
            [base]
            theory = 0.5
            implementation = 0.3
            deployment = 0.2

            [chain]
            strict_signatures = false

            [unit]
            indicator_gate = 0.6
            min_indicator_rows = 2

            [unit.sections.diagnostico]
            min_tokens = 100
            critical = true
        "#;
        let params = CalibrationParameters::from_toml_str(toml).unwrap();
        assert_eq!(params.base.theory, 0.5);
        assert!(!params.chain.strict_signatures);
        assert_eq!(params.unit.indicator_gate, 0.6);
        assert_eq!(params.unit.min_indicator_rows, 2);
        // Unspecified unit fields keep defaults
        assert_eq!(params.unit.budget_gate, 0.7);
        let diag = &params.unit.sections["diagnostico"];
        assert_eq!(diag.min_tokens, 100);
        assert_eq!(diag.min_keywords, 3);
        assert!(diag.critical);
    }

    #[test]
    fn test_penalty_cap_above_maximum_is_rejected() {
        let params =
            CalibrationParameters::from_toml_str("[unit]\npenalty_cap = 0.9\npenalty_scale = 1.0")
                .unwrap();
        let config = CalibrationConfig::default().with_parameters(params);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::ConfigurationIntegrity { ref table, .. } if table == "unit"
        ));

        let params = CalibrationParameters::from_toml_str("[unit]\npenalty_cap = 0.2").unwrap();
        CalibrationConfig::default()
            .with_parameters(params)
            .validate()
            .expect("a lower cap is allowed");
    }

    #[test]
    fn test_malformed_parameters_is_parse_error() {
        let err = CalibrationParameters::from_toml_str("[base\ntheory = ").unwrap_err();
        assert!(matches!(err, CalibrationError::ConfigParse { .. }));
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let a = CalibrationConfig::default();
        let b = CalibrationConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut intrinsic = IntrinsicTable::default();
        intrinsic.insert(
            "M",
            IntrinsicEntry {
                role: None,
                b_theory: 0.5,
                b_impl: 0.5,
                b_deploy: 0.5,
            },
        );
        let c = CalibrationConfig::default().with_intrinsic(intrinsic);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PARAMETERS_FILE),
            "[chain]\nstrict_signatures = false\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(INTRINSIC_FILE),
            r#"{"methods": {"A.run": {"role": "REPORT", "b_theory": 1.0, "b_impl": 0.5, "b_deploy": 0.0}}}"#,
        )
        .unwrap();

        let config = load_calibration_config(dir.path()).unwrap();
        assert!(!config.parameters.chain.strict_signatures);
        assert_eq!(config.intrinsic.len(), 1);
        assert!(config.signatures.is_empty());
    }

    #[test]
    fn test_load_empty_directory_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_calibration_config(dir.path()).unwrap();
        assert_eq!(config, CalibrationConfig::default());
    }

    #[test]
    fn test_malformed_table_aborts_loading() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SIGNATURES_FILE), "{ not json").unwrap();
        let err = load_calibration_config(dir.path()).unwrap_err();
        match err {
            CalibrationError::ConfigParse { path, .. } => {
                assert!(path.ends_with(SIGNATURES_FILE));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_universal_method_aborts_loading() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = CompatibilityTable::default();
        table.insert(
            "Omni.method",
            CompatibilityMapping {
                questions: [("Q001".to_string(), 0.95)].into_iter().collect(),
                dimensions: [("D1".to_string(), 0.95)].into_iter().collect(),
                policies: [("P1".to_string(), 0.95)].into_iter().collect(),
            },
        );
        std::fs::write(
            dir.path().join(COMPATIBILITY_FILE),
            serde_json::to_string(&table).unwrap(),
        )
        .unwrap();
        let err = load_calibration_config(dir.path()).unwrap_err();
        assert!(matches!(err, CalibrationError::ConfigurationIntegrity { .. }));
        assert!(err.to_string().contains("Omni.method"));
    }
}
