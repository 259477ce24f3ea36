//! @chain: input contract satisfaction
//!
//! # Score ladder
//!
//! The lowest rung triggered wins:
//!
//! ```text
//! no signature registered                         0.0
//! required input missing / hard type violation    0.0
//! critical optional input missing                 0.3
//! > half of optional inputs missing / soft type   0.6
//! contract satisfied with warnings                0.8
//! everything present, no warnings                 1.0
//! ```
//!
//! # Sequences
//!
//! In sequence mode every method's outputs join the input pool for the
//! methods after it, and the chain is only as good as its weakest method.

use super::{EvaluationInput, EvidenceKind, LayerEvaluation, LayerEvaluator};
use crate::config::{CalibrationConfig, MethodSignature};
use crate::models::{
    ChainSequenceReport, ChainValidationResult, LayerDetail, LayerId, MethodChainScore,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

const SCORE_FAILED: f64 = 0.0;
const SCORE_CRITICAL_MISSING: f64 = 0.3;
const SCORE_DEGRADED: f64 = 0.6;
const SCORE_WARNINGS: f64 = 0.8;
const SCORE_PERFECT: f64 = 1.0;

/// Above this share of missing optional inputs the contract counts as degraded
const MISSING_OPTIONAL_RATIO_LIMIT: f64 = 0.5;

/// Normalized type name used by the schema check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Any,
    Str,
    Int,
    Float,
    Bool,
    Map,
    List,
    /// Unrecognized name, lowercased
    Other(String),
}

impl DataType {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "any" | "*" => DataType::Any,
            "str" | "string" | "text" => DataType::Str,
            "int" | "integer" | "i64" => DataType::Int,
            "float" | "number" | "double" | "f64" => DataType::Float,
            "bool" | "boolean" => DataType::Bool,
            "dict" | "map" | "object" => DataType::Map,
            "list" | "array" | "sequence" => DataType::List,
            other => DataType::Other(other.to_string()),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Any => write!(f, "any"),
            DataType::Str => write!(f, "str"),
            DataType::Int => write!(f, "int"),
            DataType::Float => write!(f, "float"),
            DataType::Bool => write!(f, "bool"),
            DataType::Map => write!(f, "dict"),
            DataType::List => write!(f, "list"),
            DataType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Outcome of comparing a declared input type with the supplied one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCompatibility {
    Compatible,
    /// int vs float: usable, but the contract is degraded
    Soft,
    Hard,
}

impl TypeCompatibility {
    pub fn check(declared: &DataType, actual: &DataType) -> Self {
        if *declared == DataType::Any || *actual == DataType::Any || declared == actual {
            TypeCompatibility::Compatible
        } else if declared.is_numeric() && actual.is_numeric() {
            TypeCompatibility::Soft
        } else {
            TypeCompatibility::Hard
        }
    }
}

/// `min(scores)`, or 0.0 for an empty chain
pub fn compute_chain_quality(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().copied().fold(f64::INFINITY, f64::min)
}

pub struct ChainLayerEvaluator {
    config: Arc<CalibrationConfig>,
}

impl ChainLayerEvaluator {
    pub fn new(config: Arc<CalibrationConfig>) -> Self {
        Self { config }
    }

    pub fn has_signature(&self, method_id: &str) -> bool {
        self.config.signatures.get(method_id).is_some()
    }

    /// Validate one method against the inputs handed to it.
    ///
    /// `upstream_types` maps input names to the type the producer declared;
    /// inputs without an entry are not type-checked.
    pub fn validate_method(
        &self,
        method_id: &str,
        available: &BTreeSet<String>,
        upstream_types: &BTreeMap<String, String>,
    ) -> ChainValidationResult {
        self.validate_inner(method_id, available, upstream_types, true)
    }

    fn validate_inner(
        &self,
        method_id: &str,
        available: &BTreeSet<String>,
        upstream_types: &BTreeMap<String, String>,
        warn_extra_inputs: bool,
    ) -> ChainValidationResult {
        match self.config.signatures.get(method_id) {
            Some(signature) => {
                check_contract(signature, available, upstream_types, warn_extra_inputs)
            }
            None => ChainValidationResult {
                score: SCORE_FAILED,
                warnings: vec![format!("no signature registered for '{}'", method_id)],
                signature_known: false,
                ..Default::default()
            },
        }
    }

    /// Validate an ordered sequence of methods.
    ///
    /// `declared_outputs` overrides a method's signature `outputs` for the
    /// purpose of feeding later methods.
    pub fn evaluate_sequence(
        &self,
        methods: &[String],
        initial_inputs: &BTreeSet<String>,
        declared_outputs: &BTreeMap<String, Vec<String>>,
    ) -> ChainSequenceReport {
        let mut pool = initial_inputs.clone();
        let mut pool_types: BTreeMap<String, String> = BTreeMap::new();
        let mut method_scores = Vec::with_capacity(methods.len());

        for method_id in methods {
            let validation = self.validate_inner(method_id, &pool, &pool_types, false);
            debug!(
                "@chain sequence step {} = {:.1} (pool: {} inputs)",
                method_id,
                validation.score,
                pool.len()
            );

            let signature = self.config.signatures.get(method_id);
            let outputs = declared_outputs
                .get(method_id)
                .cloned()
                .or_else(|| signature.map(|s| s.outputs.clone()))
                .unwrap_or_default();
            let output_type = signature.and_then(|s| s.output_type.clone());
            for output in outputs {
                if let Some(ty) = &output_type {
                    pool_types.insert(output.clone(), ty.clone());
                }
                pool.insert(output);
            }

            method_scores.push(MethodChainScore {
                method_id: method_id.clone(),
                score: validation.score,
                validation,
            });
        }

        let scores: Vec<f64> = method_scores.iter().map(|m| m.score).collect();
        let chain_quality = compute_chain_quality(&scores);
        let weakest_link = method_scores
            .iter()
            .find(|m| m.score == chain_quality)
            .map(|m| m.method_id.clone());

        ChainSequenceReport {
            method_scores,
            weakest_link,
            chain_quality,
        }
    }
}

fn check_contract(
    signature: &MethodSignature,
    available: &BTreeSet<String>,
    upstream_types: &BTreeMap<String, String>,
    warn_extra_inputs: bool,
) -> ChainValidationResult {
    let mut result = ChainValidationResult {
        signature_known: true,
        ..Default::default()
    };

    result.missing_required = signature
        .required_inputs
        .iter()
        .filter(|input| !available.contains(*input))
        .cloned()
        .collect();

    let critical: BTreeSet<&String> = signature.critical_optional.iter().collect();
    for input in &signature.optional_inputs {
        if available.contains(input) {
            continue;
        }
        if critical.contains(input) {
            result.missing_critical.push(input.clone());
        }
        result.missing_optional.push(input.clone());
    }

    let mut hard_violations = 0usize;
    let mut soft_violations = 0usize;
    for (input, declared) in &signature.input_types {
        if !available.contains(input) {
            continue;
        }
        let Some(actual) = upstream_types.get(input) else {
            continue;
        };
        let (declared_ty, actual_ty) = (DataType::parse(declared), DataType::parse(actual));
        match TypeCompatibility::check(&declared_ty, &actual_ty) {
            TypeCompatibility::Compatible => {}
            TypeCompatibility::Soft => {
                soft_violations += 1;
                result.schema_violations.push(format!(
                    "'{}': expected {}, got {} (coercible)",
                    input, declared_ty, actual_ty
                ));
            }
            TypeCompatibility::Hard => {
                hard_violations += 1;
                result.schema_violations.push(format!(
                    "'{}': expected {}, got {}",
                    input, declared_ty, actual_ty
                ));
            }
        }
    }

    let missing_optional_ratio = if signature.optional_inputs.is_empty() {
        0.0
    } else {
        result.missing_optional.len() as f64 / signature.optional_inputs.len() as f64
    };

    if warn_extra_inputs {
        let declared: BTreeSet<&String> = signature
            .required_inputs
            .iter()
            .chain(signature.optional_inputs.iter())
            .collect();
        for extra in available.iter().filter(|i| !declared.contains(i)) {
            result
                .warnings
                .push(format!("undeclared input '{}'", extra));
        }
    }
    if missing_optional_ratio <= MISSING_OPTIONAL_RATIO_LIMIT {
        for input in &result.missing_optional {
            if !critical.contains(input) {
                result
                    .warnings
                    .push(format!("optional input '{}' not provided", input));
            }
        }
    }

    result.score = if !result.missing_required.is_empty() || hard_violations > 0 {
        SCORE_FAILED
    } else if !result.missing_critical.is_empty() {
        SCORE_CRITICAL_MISSING
    } else if missing_optional_ratio > MISSING_OPTIONAL_RATIO_LIMIT || soft_violations > 0 {
        SCORE_DEGRADED
    } else if !result.warnings.is_empty() {
        SCORE_WARNINGS
    } else {
        SCORE_PERFECT
    };
    result
}

impl LayerEvaluator for ChainLayerEvaluator {
    fn consumer_id(&self) -> &'static str {
        "chain"
    }

    fn layer(&self) -> LayerId {
        LayerId::Chain
    }

    fn declared_capabilities(&self) -> &'static [EvidenceKind] {
        &[EvidenceKind::MethodId, EvidenceKind::AvailableInputs]
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Option<LayerEvaluation> {
        let validation = self.validate_method(
            input.method_id,
            &input.evidence.available_inputs,
            &input.evidence.upstream_types,
        );
        if !validation.signature_known {
            warn!("@chain: no signature for '{}', scoring 0.0", input.method_id);
        }
        debug!("@chain {} = {:.1}", input.method_id, validation.score);

        let warnings = validation
            .warnings
            .iter()
            .map(|w| format!("@chain: {}", w))
            .collect();
        Some(
            LayerEvaluation::new(validation.score, LayerDetail::Chain(validation))
                .with_warnings(warnings),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignatureTable;

    fn inputs(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn evaluator() -> ChainLayerEvaluator {
        let mut table = SignatureTable::default();
        table.insert(
            "Extractor.extract",
            MethodSignature::new(["document", "config"])
                .critical("metadata")
                .optional(["cache", "debug"]),
        );
        table.insert(
            "Typed.run",
            MethodSignature::new(["count", "label"])
                .typed("count", "int")
                .typed("label", "str")
                .output("float")
                .produces(["ratio"]),
        );
        table.insert(
            "Load.pdf",
            MethodSignature::new(["path"]).output("dict").produces(["doc"]),
        );
        table.insert("Parse.doc", MethodSignature::new(["doc"]).produces(["tables"]));
        table.insert(
            "Score.tables",
            MethodSignature::new(["tables"]).critical("weights"),
        );
        ChainLayerEvaluator::new(Arc::new(CalibrationConfig::default().with_signatures(table)))
    }

    #[test]
    fn test_critical_optional_missing_scores_point_three() {
        let result = evaluator().validate_method(
            "Extractor.extract",
            &inputs(&["document", "config"]),
            &BTreeMap::new(),
        );
        assert_eq!(result.score, 0.3);
        assert_eq!(result.missing_critical, vec!["metadata"]);
        assert!(result.missing_required.is_empty());
    }

    #[test]
    fn test_missing_required_scores_zero() {
        let result = evaluator().validate_method(
            "Extractor.extract",
            &inputs(&["document", "metadata", "cache", "debug"]),
            &BTreeMap::new(),
        );
        assert_eq!(result.score, 0.0);
        assert_eq!(result.missing_required, vec!["config"]);
    }

    #[test]
    fn test_all_present_is_perfect() {
        let result = evaluator().validate_method(
            "Extractor.extract",
            &inputs(&["document", "config", "metadata", "cache", "debug"]),
            &BTreeMap::new(),
        );
        assert_eq!(result.score, 1.0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_few_optional_missing_is_warning() {
        // 1 of 3 optional inputs missing, critical present
        let result = evaluator().validate_method(
            "Extractor.extract",
            &inputs(&["document", "config", "metadata", "cache"]),
            &BTreeMap::new(),
        );
        assert_eq!(result.score, 0.8);
        assert_eq!(result.missing_optional, vec!["debug"]);
    }

    #[test]
    fn test_extra_input_is_warning() {
        let result = evaluator().validate_method(
            "Extractor.extract",
            &inputs(&["document", "config", "metadata", "cache", "debug", "stray"]),
            &BTreeMap::new(),
        );
        assert_eq!(result.score, 0.8);
        assert!(result.warnings[0].contains("stray"));
    }

    #[test]
    fn test_many_optional_missing_is_degraded() {
        let mut table = SignatureTable::default();
        table.insert("M", MethodSignature::new(["a"]).optional(["x", "y", "z"]));
        let eval = ChainLayerEvaluator::new(Arc::new(
            CalibrationConfig::default().with_signatures(table),
        ));
        let result = eval.validate_method("M", &inputs(&["a"]), &BTreeMap::new());
        assert_eq!(result.score, 0.6);
    }

    #[test]
    fn test_type_rules() {
        let types = |count: &str, label: &str| -> BTreeMap<String, String> {
            [("count".to_string(), count.to_string()), ("label".to_string(), label.to_string())]
                .into_iter()
                .collect()
        };
        let eval = evaluator();
        let provided = inputs(&["count", "label"]);

        let ok = eval.validate_method("Typed.run", &provided, &types("integer", "string"));
        assert_eq!(ok.score, 1.0);

        let soft = eval.validate_method("Typed.run", &provided, &types("float", "str"));
        assert_eq!(soft.score, 0.6);
        assert_eq!(soft.schema_violations.len(), 1);

        let hard = eval.validate_method("Typed.run", &provided, &types("int", "list"));
        assert_eq!(hard.score, 0.0);

        let any = eval.validate_method("Typed.run", &provided, &types("any", "str"));
        assert_eq!(any.score, 1.0);
    }

    #[test]
    fn test_type_compatibility_table() {
        use DataType::*;
        assert_eq!(TypeCompatibility::check(&Any, &Map), TypeCompatibility::Compatible);
        assert_eq!(TypeCompatibility::check(&Float, &Int), TypeCompatibility::Soft);
        assert_eq!(TypeCompatibility::check(&Int, &Float), TypeCompatibility::Soft);
        assert_eq!(TypeCompatibility::check(&Str, &Bool), TypeCompatibility::Hard);
        assert_eq!(
            TypeCompatibility::check(&DataType::parse("DataFrame"), &DataType::parse("dataframe")),
            TypeCompatibility::Compatible
        );
    }

    #[test]
    fn test_unknown_signature() {
        let result = evaluator().validate_method("Ghost.run", &inputs(&["x"]), &BTreeMap::new());
        assert_eq!(result.score, 0.0);
        assert!(!result.signature_known);
    }

    #[test]
    fn test_chain_quality_is_min() {
        assert_eq!(compute_chain_quality(&[]), 0.0);
        assert_eq!(compute_chain_quality(&[1.0, 0.3, 0.8]), 0.3);
        assert_eq!(compute_chain_quality(&[0.6]), 0.6);
    }

    #[test]
    fn test_sequence_propagates_outputs() {
        let methods: Vec<String> = ["Load.pdf", "Parse.doc", "Score.tables"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = evaluator().evaluate_sequence(&methods, &inputs(&["path"]), &BTreeMap::new());

        let scores: Vec<f64> = report.method_scores.iter().map(|m| m.score).collect();
        assert_eq!(scores, vec![1.0, 1.0, 0.3]);
        assert_eq!(report.chain_quality, 0.3);
        assert_eq!(report.weakest_link.as_deref(), Some("Score.tables"));
    }

    #[test]
    fn test_sequence_declared_outputs_override() {
        let methods: Vec<String> = ["Load.pdf", "Parse.doc"].iter().map(|s| s.to_string()).collect();
        let mut declared = BTreeMap::new();
        declared.insert("Load.pdf".to_string(), vec!["raw_bytes".to_string()]);
        let report = evaluator().evaluate_sequence(&methods, &inputs(&["path"]), &declared);
        assert_eq!(report.method_scores[1].score, 0.0);
        assert_eq!(report.method_scores[1].validation.missing_required, vec!["doc"]);
        assert_eq!(report.weakest_link.as_deref(), Some("Parse.doc"));
    }

    #[test]
    fn test_sequence_pool_does_not_warn_extra() {
        let methods: Vec<String> = ["Load.pdf", "Parse.doc"].iter().map(|s| s.to_string()).collect();
        let report = evaluator().evaluate_sequence(&methods, &inputs(&["path"]), &BTreeMap::new());
        // "path" is still in the pool when Parse.doc runs
        assert!(report.method_scores[1].validation.warnings.is_empty());
        assert_eq!(report.chain_quality, 1.0);
        assert_eq!(report.weakest_link.as_deref(), Some("Load.pdf"));
    }

    #[test]
    fn test_empty_sequence() {
        let report = evaluator().evaluate_sequence(&[], &BTreeSet::new(), &BTreeMap::new());
        assert_eq!(report.chain_quality, 0.0);
        assert!(report.weakest_link.is_none());
    }
}
