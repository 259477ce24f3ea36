//! Core data models for layercal
//!
//! These models are shared by the evaluators, the aggregator and the
//! orchestrator: layer and role tags, the calibration subject, the evidence
//! handed in per call, and the auditable result handed back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// One of the eight orthogonal quality layers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    /// @b - intrinsic method quality
    Base,
    /// @chain - input contract satisfaction
    Chain,
    /// @u - source document structural integrity
    Unit,
    /// @q - question compatibility
    Question,
    /// @d - dimension compatibility
    Dimension,
    /// @p - policy area compatibility
    Policy,
    /// @C - ensemble congruence
    Congruence,
    /// @m - governance / meta
    Meta,
}

impl LayerId {
    pub const ALL: [LayerId; 8] = [
        LayerId::Base,
        LayerId::Chain,
        LayerId::Unit,
        LayerId::Question,
        LayerId::Dimension,
        LayerId::Policy,
        LayerId::Congruence,
        LayerId::Meta,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayerId::Base => "base",
            LayerId::Chain => "chain",
            LayerId::Unit => "unit",
            LayerId::Question => "question",
            LayerId::Dimension => "dimension",
            LayerId::Policy => "policy",
            LayerId::Congruence => "congruence",
            LayerId::Meta => "meta",
        }
    }

    /// Short symbolic tag (`@b`, `@chain`, ...)
    pub fn symbol(&self) -> &'static str {
        match self {
            LayerId::Base => "@b",
            LayerId::Chain => "@chain",
            LayerId::Unit => "@u",
            LayerId::Question => "@q",
            LayerId::Dimension => "@d",
            LayerId::Policy => "@p",
            LayerId::Congruence => "@C",
            LayerId::Meta => "@m",
        }
    }

    /// The full eight-layer set used when a role cannot be resolved
    pub fn core_set() -> BTreeSet<LayerId> {
        LayerId::ALL.iter().copied().collect()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LayerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "@C" is the only case-sensitive symbol, keep it ahead of lowercasing
        if s.trim() == "@C" {
            return Ok(LayerId::Congruence);
        }
        match s.trim().to_lowercase().as_str() {
            "base" | "@b" | "b" => Ok(LayerId::Base),
            "chain" | "@chain" => Ok(LayerId::Chain),
            "unit" | "@u" | "u" => Ok(LayerId::Unit),
            "question" | "@q" | "q" => Ok(LayerId::Question),
            "dimension" | "@d" | "d" => Ok(LayerId::Dimension),
            "policy" | "@p" | "p" => Ok(LayerId::Policy),
            "congruence" | "c" => Ok(LayerId::Congruence),
            "meta" | "@m" | "m" => Ok(LayerId::Meta),
            other => Err(format!("Unknown layer '{}'", other)),
        }
    }
}

/// Functional category a method plays in the pipeline
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleTag {
    IngestPdm,
    Structure,
    Extract,
    ScoreQ,
    Aggregate,
    Report,
    MetaTool,
    Transform,
}

impl RoleTag {
    pub const ALL: [RoleTag; 8] = [
        RoleTag::IngestPdm,
        RoleTag::Structure,
        RoleTag::Extract,
        RoleTag::ScoreQ,
        RoleTag::Aggregate,
        RoleTag::Report,
        RoleTag::MetaTool,
        RoleTag::Transform,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RoleTag::IngestPdm => "INGEST_PDM",
            RoleTag::Structure => "STRUCTURE",
            RoleTag::Extract => "EXTRACT",
            RoleTag::ScoreQ => "SCORE_Q",
            RoleTag::Aggregate => "AGGREGATE",
            RoleTag::Report => "REPORT",
            RoleTag::MetaTool => "META_TOOL",
            RoleTag::Transform => "TRANSFORM",
        }
    }

    /// Canonical layer set for this role. This is the only place the
    /// role-to-layer mapping is defined.
    pub fn required_layers(&self) -> &'static [LayerId] {
        use LayerId::*;
        match self {
            RoleTag::IngestPdm | RoleTag::Structure | RoleTag::Extract => {
                &[Base, Chain, Unit, Meta]
            }
            RoleTag::ScoreQ => &LayerId::ALL,
            RoleTag::Aggregate => &[Base, Chain, Dimension, Policy, Congruence, Meta],
            RoleTag::Report => &[Base, Chain, Congruence, Meta],
            RoleTag::MetaTool | RoleTag::Transform => &[Base, Chain, Meta],
        }
    }

    pub fn layer_set(&self) -> BTreeSet<LayerId> {
        self.required_layers().iter().copied().collect()
    }
}

impl std::fmt::Display for RoleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RoleTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "INGEST_PDM" => Ok(RoleTag::IngestPdm),
            "STRUCTURE" => Ok(RoleTag::Structure),
            "EXTRACT" => Ok(RoleTag::Extract),
            "SCORE_Q" => Ok(RoleTag::ScoreQ),
            "AGGREGATE" => Ok(RoleTag::Aggregate),
            "REPORT" => Ok(RoleTag::Report),
            "META_TOOL" => Ok(RoleTag::MetaTool),
            "TRANSFORM" => Ok(RoleTag::Transform),
            _ => Err(format!(
                "Unknown role '{}'. Valid roles: INGEST_PDM, STRUCTURE, EXTRACT, SCORE_Q, AGGREGATE, REPORT, META_TOOL, TRANSFORM",
                s
            )),
        }
    }
}

/// What is being calibrated, and under which role
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationSubject {
    pub method_id: String,
    /// Explicit role declared by the caller; overrides table metadata
    #[serde(default)]
    pub role: Option<RoleTag>,
    /// Opaque caller context, echoed into result metadata
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl CalibrationSubject {
    pub fn new(method_id: impl Into<String>) -> Self {
        Self {
            method_id: method_id.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: RoleTag) -> Self {
        self.role = Some(role);
        self
    }
}

/// Per-section counts extracted from a source document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionStats {
    #[serde(default)]
    pub token_count: usize,
    #[serde(default)]
    pub keyword_matches: usize,
    #[serde(default)]
    pub numeric_count: usize,
    #[serde(default)]
    pub source_citations: usize,
}

/// One row of the indicator table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub strategic_line: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub baseline_value: Option<String>,
    #[serde(default)]
    pub baseline_year: Option<String>,
    #[serde(default)]
    pub target_value: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl IndicatorRow {
    pub const FIELDS: &'static [&'static str] = &[
        "code",
        "name",
        "strategic_line",
        "program",
        "baseline_value",
        "baseline_year",
        "target_value",
        "unit",
        "source",
    ];

    /// Look up a field by name; used for configurable required-field lists
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "code" => &self.code,
            "name" => &self.name,
            "strategic_line" => &self.strategic_line,
            "program" => &self.program,
            "baseline_value" => &self.baseline_value,
            "baseline_year" => &self.baseline_year,
            "target_value" => &self.target_value,
            "unit" => &self.unit,
            "source" => &self.source,
            _ => return None,
        };
        value.as_deref()
    }
}

/// One row of the multi-year investment plan (PPI)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetRow {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub funding_source: Option<String>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    /// Four annual allocations, in plan order
    #[serde(default)]
    pub allocations: [Option<f64>; 4],
}

/// Structured view of a source document, produced by an external parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdtStructure {
    /// Block ids in the order they appear in the document
    #[serde(default)]
    pub blocks_found: Vec<String>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionStats>,
    #[serde(default)]
    pub indicator_rows: Vec<IndicatorRow>,
    #[serde(default)]
    pub ppi_rows: Vec<BudgetRow>,
}

/// Raw material for the evaluators, supplied by the invoking executor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceStore {
    #[serde(default)]
    pub pdt_structure: Option<PdtStructure>,
    /// Pre-computed document quality, used by @u when no structure is given
    #[serde(default)]
    pub document_quality: Option<f64>,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub dimension_id: Option<String>,
    #[serde(default)]
    pub policy_area_id: Option<String>,
    /// Input names handed to the method
    #[serde(default)]
    pub available_inputs: BTreeSet<String>,
    /// Declared types of upstream outputs, keyed by input name
    #[serde(default)]
    pub upstream_types: BTreeMap<String, String>,
}

/// How the role used for a calibration was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    /// Declared on the calibration subject
    Subject,
    /// Declared in the intrinsic table
    Declared,
    /// Guessed from the method name
    Inferred,
    /// No usable role, full layer set applied
    Fallback,
}

/// Outcome of the @chain contract check for a single method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainValidationResult {
    pub score: f64,
    pub missing_required: Vec<String>,
    pub missing_critical: Vec<String>,
    pub missing_optional: Vec<String>,
    pub schema_violations: Vec<String>,
    pub warnings: Vec<String>,
    /// False when no signature was registered for the method
    pub signature_known: bool,
}

/// S component breakdown of the @u layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralBreakdown {
    pub block_coverage: f64,
    pub header_validity: f64,
    pub sequence_ordering: f64,
}

/// Outcome of the @u layer for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitLayerResult {
    pub s: f64,
    pub m: f64,
    pub i: f64,
    pub p: f64,
    pub i_gate_passed: bool,
    pub p_gate_passed: bool,
    pub structural: StructuralBreakdown,
    pub u_raw: f64,
    pub penalty: f64,
    pub u_final: f64,
}

/// Where a lookup-based layer score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreProvenance {
    /// Found in a configuration table
    Table,
    /// Role-level value from the fusion table
    RoleDefault,
    /// Named fallback constant
    Fallback,
    /// Unmapped context in the compatibility table
    UnmappedPenalty,
    /// Pre-computed value passed with the evidence
    Precomputed,
}

/// Evaluator-specific detail attached to a layer score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerDetail {
    Lookup { provenance: ScoreProvenance },
    Chain(ChainValidationResult),
    Unit(UnitLayerResult),
}

/// Contribution of one linear term to the fused score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTerm {
    pub layer: LayerId,
    pub weight: f64,
    pub score: f64,
    pub contribution: f64,
}

/// Contribution of one pairwise interaction term to the fused score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTerm {
    pub layers: (LayerId, LayerId),
    pub weight: f64,
    pub min_score: f64,
    pub contribution: f64,
}

/// Every term of a Choquet fusion, for audit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionBreakdown {
    pub linear: Vec<LinearTerm>,
    pub interactions: Vec<InteractionTerm>,
    pub linear_sum: f64,
    pub interaction_sum: f64,
    /// Sum before clamping to [0, 1]
    pub raw: f64,
}

/// Coarse label for a final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    Insufficient,
    Acceptable,
    Good,
    Excellent,
}

impl QualityBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            QualityBand::Excellent
        } else if score >= 0.70 {
            QualityBand::Good
        } else if score >= 0.55 {
            QualityBand::Acceptable
        } else {
            QualityBand::Insufficient
        }
    }
}

impl std::fmt::Display for QualityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityBand::Excellent => write!(f, "excellent"),
            QualityBand::Good => write!(f, "good"),
            QualityBand::Acceptable => write!(f, "acceptable"),
            QualityBand::Insufficient => write!(f, "insufficient"),
        }
    }
}

/// Audit metadata attached to every calibration result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMetadata {
    pub role_source: RoleSource,
    /// SHA-256 of the configuration the result was computed with
    pub config_fingerprint: String,
    pub quality_band: QualityBand,
    pub fusion: FusionBreakdown,
    pub layer_details: BTreeMap<LayerId, LayerDetail>,
    pub warnings: Vec<String>,
    pub context: BTreeMap<String, serde_json::Value>,
}

/// Auditable result of one calibration call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub method_id: String,
    /// None when the role could not be resolved and the core set was used
    pub role: Option<RoleTag>,
    pub final_score: f64,
    pub layer_scores: BTreeMap<LayerId, f64>,
    pub active_layers: BTreeSet<LayerId>,
    pub metadata: CalibrationMetadata,
}

/// Per-method entry of a chain sequence report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodChainScore {
    pub method_id: String,
    pub score: f64,
    pub validation: ChainValidationResult,
}

/// Result of validating an ordered sequence of methods
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSequenceReport {
    /// Per-method scores in sequence order
    pub method_scores: Vec<MethodChainScore>,
    /// Method with the lowest score (first one on ties)
    pub weakest_link: Option<String>,
    pub chain_quality: f64,
}
