//! Read-only method tables
//!
//! Each table is a versioned JSON document keyed by method id:
//!
//! ```json
//! {
//!   "version": "2024-11",
//!   "methods": {
//!     "IndicatorScorer.score": { "role": "SCORE_Q", "b_theory": 0.9, "b_impl": 0.8, "b_deploy": 0.7 }
//!   }
//! }
//! ```

use crate::error::{CalResult, CalibrationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A versioned table of per-method records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodTable<T> {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "BTreeMap::new")]
    pub methods: BTreeMap<String, T>,
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self {
        Self {
            version: None,
            methods: BTreeMap::new(),
        }
    }
}

impl<T> MethodTable<T> {
    pub fn get(&self, method_id: &str) -> Option<&T> {
        self.methods.get(method_id)
    }

    pub fn insert(&mut self, method_id: impl Into<String>, entry: T) {
        self.methods.insert(method_id.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Intrinsic quality record: declared role plus the three @b sub-scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicEntry {
    /// Role name as written in the table; parsed at resolution time
    #[serde(default)]
    pub role: Option<String>,
    pub b_theory: f64,
    pub b_impl: f64,
    pub b_deploy: f64,
}

/// Per-context compatibility scores for one method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityMapping {
    #[serde(default)]
    pub questions: BTreeMap<String, f64>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, f64>,
    #[serde(default)]
    pub policies: BTreeMap<String, f64>,
}

/// Declared input/output contract of a method, consumed by @chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    #[serde(default)]
    pub required_inputs: Vec<String>,
    #[serde(default)]
    pub optional_inputs: Vec<String>,
    /// Subset of `optional_inputs` whose absence caps the score at 0.3
    #[serde(default)]
    pub critical_optional: Vec<String>,
    #[serde(default)]
    pub input_types: BTreeMap<String, String>,
    #[serde(default)]
    pub output_type: Option<String>,
    /// Names this method produces when run in a sequence
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl MethodSignature {
    pub fn new<S: Into<String>>(required: impl IntoIterator<Item = S>) -> Self {
        Self {
            required_inputs: required.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn optional<S: Into<String>>(mut self, inputs: impl IntoIterator<Item = S>) -> Self {
        self.optional_inputs
            .extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Declare a critical optional input (also added to the optional list)
    pub fn critical(mut self, input: impl Into<String>) -> Self {
        let input = input.into();
        if !self.optional_inputs.contains(&input) {
            self.optional_inputs.push(input.clone());
        }
        self.critical_optional.push(input);
        self
    }

    pub fn typed(mut self, input: impl Into<String>, ty: impl Into<String>) -> Self {
        self.input_types.insert(input.into(), ty.into());
        self
    }

    pub fn output(mut self, ty: impl Into<String>) -> Self {
        self.output_type = Some(ty.into());
        self
    }

    pub fn produces<S: Into<String>>(mut self, outputs: impl IntoIterator<Item = S>) -> Self {
        self.outputs.extend(outputs.into_iter().map(Into::into));
        self
    }
}

/// Method-catalog record feeding @C and @m
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub congruence: Option<f64>,
    #[serde(default)]
    pub transparency: Option<f64>,
    #[serde(default)]
    pub governance: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

pub type IntrinsicTable = MethodTable<IntrinsicEntry>;
pub type CompatibilityTable = MethodTable<CompatibilityMapping>;
pub type SignatureTable = MethodTable<MethodSignature>;
pub type MethodCatalog = MethodTable<CatalogEntry>;

fn check_unit_interval(table: &str, method_id: &str, field: &str, value: f64) -> CalResult<()> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(CalibrationError::integrity(
            table,
            format!(
                "method '{}' has {} = {} outside [0, 1]",
                method_id, field, value
            ),
        ));
    }
    Ok(())
}

/// Validate intrinsic sub-scores are in [0, 1]
pub fn validate_intrinsic(table: &IntrinsicTable) -> CalResult<()> {
    for (id, entry) in &table.methods {
        check_unit_interval("intrinsic", id, "b_theory", entry.b_theory)?;
        check_unit_interval("intrinsic", id, "b_impl", entry.b_impl)?;
        check_unit_interval("intrinsic", id, "b_deploy", entry.b_deploy)?;
    }
    Ok(())
}

/// Validate critical inputs are declared optional and not also required
pub fn validate_signatures(table: &SignatureTable) -> CalResult<()> {
    for (id, sig) in &table.methods {
        let optional: BTreeSet<&String> = sig.optional_inputs.iter().collect();
        let required: BTreeSet<&String> = sig.required_inputs.iter().collect();
        for critical in &sig.critical_optional {
            if !optional.contains(critical) {
                return Err(CalibrationError::integrity(
                    "signatures",
                    format!(
                        "method '{}' lists critical input '{}' that is not an optional input",
                        id, critical
                    ),
                ));
            }
        }
        if let Some(both) = optional.intersection(&required).next() {
            return Err(CalibrationError::integrity(
                "signatures",
                format!(
                    "method '{}' declares '{}' as both required and optional",
                    id, both
                ),
            ));
        }
    }
    Ok(())
}

/// Validate catalog values are in [0, 1]
pub fn validate_catalog(table: &MethodCatalog) -> CalResult<()> {
    for (id, entry) in &table.methods {
        let fields = [
            ("congruence", entry.congruence),
            ("transparency", entry.transparency),
            ("governance", entry.governance),
            ("cost", entry.cost),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                check_unit_interval("catalog", id, name, v)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intrinsic_table() {
        let json = r#"{
            "version": "v1",
            "methods": {
                "Scorer.run": { "role": "SCORE_Q", "b_theory": 0.9, "b_impl": 0.8, "b_deploy": 0.7 },
                "Loader.load": { "b_theory": 0.5, "b_impl": 0.5, "b_deploy": 0.5 }
            }
        }"#;
        let table: IntrinsicTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.version.as_deref(), Some("v1"));
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("Scorer.run").and_then(|e| e.role.as_deref()),
            Some("SCORE_Q")
        );
        assert!(table.get("Loader.load").unwrap().role.is_none());
        assert!(validate_intrinsic(&table).is_ok());
    }

    #[test]
    fn test_intrinsic_out_of_range_rejected() {
        let mut table = IntrinsicTable::default();
        table.insert(
            "Bad.method",
            IntrinsicEntry {
                role: None,
                b_theory: 1.2,
                b_impl: 0.5,
                b_deploy: 0.5,
            },
        );
        let err = validate_intrinsic(&table).unwrap_err();
        assert!(err.to_string().contains("Bad.method"));
    }

    #[test]
    fn test_signature_builder_marks_critical_as_optional() {
        let sig = MethodSignature::new(["document", "config"])
            .critical("metadata")
            .optional(["cache", "debug"]);
        assert_eq!(sig.optional_inputs, vec!["metadata", "cache", "debug"]);
        assert_eq!(sig.critical_optional, vec!["metadata"]);
    }

    #[test]
    fn test_critical_must_be_optional() {
        let mut table = SignatureTable::default();
        table.insert(
            "M",
            MethodSignature {
                required_inputs: vec!["a".into()],
                critical_optional: vec!["b".into()],
                ..Default::default()
            },
        );
        assert!(validate_signatures(&table).is_err());
    }

    #[test]
    fn test_required_and_optional_overlap_rejected() {
        let mut table = SignatureTable::default();
        table.insert("M", MethodSignature::new(["a"]).optional(["a"]));
        let err = validate_signatures(&table).unwrap_err();
        assert!(err.to_string().contains("both required and optional"));
    }

    #[test]
    fn test_catalog_partial_entries() {
        let json = r#"{ "methods": { "R.render": { "governance": 0.9 } } }"#;
        let table: MethodCatalog = serde_json::from_str(json).unwrap();
        let entry = table.get("R.render").unwrap();
        assert_eq!(entry.governance, Some(0.9));
        assert!(entry.transparency.is_none());
        assert!(validate_catalog(&table).is_ok());
    }
}
