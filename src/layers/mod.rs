//! Layer evaluators
//!
//! Every layer is scored by one evaluator implementing [`LayerEvaluator`].
//! Evaluators never call each other; the orchestrator is the only component
//! that sees all of them.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  CalibrationOrchestrator                  │
//! └───────────────────────────────────────────────────────────┘
//!          │            │             │              │
//!          ▼            ▼             ▼              ▼
//!   ┌────────────┐ ┌──────────┐ ┌───────────┐ ┌─────────────────┐
//!   │ @b base    │ │ @chain   │ │ @u unit   │ │ @q @d @p        │
//!   │ @C  @m     │ │ contract │ │ document  │ │ (registry view) │
//!   └────────────┘ └──────────┘ └───────────┘ └─────────────────┘
//! ```
//!
//! An evaluator returns `None` when the evidence it consumes is missing.
//! It never substitutes a default for missing evidence; the orchestrator's
//! completeness check reports the gap instead.

mod base;
mod chain;
mod compatibility;
mod congruence;
mod contextual;
mod meta;
mod unit;

pub use base::{BaseLayerEvaluator, MISSING_METHOD_BASE_SCORE};
pub use chain::{compute_chain_quality, ChainLayerEvaluator, DataType, TypeCompatibility};
pub use compatibility::{CompatibilityRegistry, UNIVERSALITY_THRESHOLD, UNMAPPED_CONTEXT_PENALTY};
pub use congruence::{CongruenceLayerEvaluator, DEFAULT_CONGRUENCE_SCORE};
pub use contextual::{ContextAxis, ContextualLayerEvaluator};
pub use meta::{MetaLayerEvaluator, DEFAULT_META_SCORE};
pub use unit::{evaluate_pdt, is_placeholder, UnitLayerEvaluator};

use crate::models::{EvidenceStore, LayerDetail, LayerId, RoleTag};

/// A piece of evidence an evaluator consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    MethodId,
    ResolvedRole,
    /// Either a PDT structure or a pre-computed document quality
    DocumentEvidence,
    QuestionId,
    DimensionId,
    PolicyAreaId,
    AvailableInputs,
}

impl EvidenceKind {
    pub fn name(&self) -> &'static str {
        match self {
            EvidenceKind::MethodId => "method_id",
            EvidenceKind::ResolvedRole => "role",
            EvidenceKind::DocumentEvidence => "pdt_structure or document_quality",
            EvidenceKind::QuestionId => "question_id",
            EvidenceKind::DimensionId => "dimension_id",
            EvidenceKind::PolicyAreaId => "policy_area_id",
            EvidenceKind::AvailableInputs => "available_inputs",
        }
    }

    /// Whether the evidence store carries this kind.
    ///
    /// Method id and role come from the subject, and an empty input set is a
    /// legitimate (scored) situation for @chain, so those always count as present.
    pub fn is_provided_by(&self, evidence: &EvidenceStore) -> bool {
        match self {
            EvidenceKind::MethodId | EvidenceKind::ResolvedRole | EvidenceKind::AvailableInputs => {
                true
            }
            EvidenceKind::DocumentEvidence => {
                evidence.pdt_structure.is_some() || evidence.document_quality.is_some()
            }
            EvidenceKind::QuestionId => evidence.question_id.is_some(),
            EvidenceKind::DimensionId => evidence.dimension_id.is_some(),
            EvidenceKind::PolicyAreaId => evidence.policy_area_id.is_some(),
        }
    }
}

/// What an evaluator sees for one call
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub method_id: &'a str,
    /// Resolved role; None when the core layer set is in use
    pub role: Option<RoleTag>,
    pub evidence: &'a EvidenceStore,
}

/// A layer score plus evaluator-specific detail
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEvaluation {
    pub score: f64,
    pub detail: LayerDetail,
    pub warnings: Vec<String>,
}

impl LayerEvaluation {
    pub fn new(score: f64, detail: LayerDetail) -> Self {
        Self {
            score,
            detail,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Evidence consumer that scores exactly one layer
pub trait LayerEvaluator: Send + Sync {
    /// Stable identifier used in logs and warnings
    fn consumer_id(&self) -> &'static str;

    /// The layer this evaluator scores
    fn layer(&self) -> LayerId;

    /// Evidence this evaluator reads
    fn declared_capabilities(&self) -> &'static [EvidenceKind];

    /// Score the layer, or None when required evidence is absent
    fn evaluate(&self, input: &EvaluationInput<'_>) -> Option<LayerEvaluation>;

    /// Evidence kinds this evaluator needs but the store lacks
    fn missing_evidence(&self, evidence: &EvidenceStore) -> Vec<EvidenceKind> {
        self.declared_capabilities()
            .iter()
            .copied()
            .filter(|kind| !kind.is_provided_by(evidence))
            .collect()
    }
}

/// Clamp into [0, 1]; NaN maps to 0
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
