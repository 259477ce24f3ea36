//! @C: ensemble congruence
//!
//! Catalog override first, then the role-level value from the fusion table,
//! then [`DEFAULT_CONGRUENCE_SCORE`].

use super::{EvaluationInput, EvidenceKind, LayerEvaluation, LayerEvaluator};
use crate::config::CalibrationConfig;
use crate::models::{LayerDetail, LayerId, RoleTag, ScoreProvenance};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_CONGRUENCE_SCORE: f64 = 0.6;

pub struct CongruenceLayerEvaluator {
    config: Arc<CalibrationConfig>,
}

impl CongruenceLayerEvaluator {
    pub fn new(config: Arc<CalibrationConfig>) -> Self {
        Self { config }
    }

    pub fn score(&self, method_id: &str, role: Option<RoleTag>) -> (f64, ScoreProvenance) {
        if let Some(c) = self
            .config
            .catalog
            .get(method_id)
            .and_then(|entry| entry.congruence)
        {
            return (c, ScoreProvenance::Table);
        }
        if let Some(c) = self.config.parameters.fusion.weights_for(role).congruence {
            return (c, ScoreProvenance::RoleDefault);
        }
        (DEFAULT_CONGRUENCE_SCORE, ScoreProvenance::Fallback)
    }
}

impl LayerEvaluator for CongruenceLayerEvaluator {
    fn consumer_id(&self) -> &'static str {
        "congruence"
    }

    fn layer(&self) -> LayerId {
        LayerId::Congruence
    }

    fn declared_capabilities(&self) -> &'static [EvidenceKind] {
        &[EvidenceKind::MethodId, EvidenceKind::ResolvedRole]
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Option<LayerEvaluation> {
        let (score, provenance) = self.score(input.method_id, input.role);
        debug!("@C {} = {:.4} ({:?})", input.method_id, score, provenance);
        Some(LayerEvaluation::new(score, LayerDetail::Lookup { provenance }))
    }
}
