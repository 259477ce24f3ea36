//! @b: intrinsic method quality
//!
//! `@b = w_theory·b_theory + w_impl·b_impl + w_deploy·b_deploy`

use super::{clamp_unit, EvaluationInput, EvidenceKind, LayerEvaluation, LayerEvaluator};
use crate::config::CalibrationConfig;
use crate::models::{LayerDetail, LayerId, ScoreProvenance};
use std::sync::Arc;
use tracing::debug;

/// Score for a method absent from the intrinsic table
pub const MISSING_METHOD_BASE_SCORE: f64 = 0.5;

pub struct BaseLayerEvaluator {
    config: Arc<CalibrationConfig>,
}

impl BaseLayerEvaluator {
    pub fn new(config: Arc<CalibrationConfig>) -> Self {
        Self { config }
    }

    /// Weighted blend of the intrinsic sub-scores, with provenance
    pub fn score(&self, method_id: &str) -> (f64, ScoreProvenance) {
        let Some(entry) = self.config.intrinsic.get(method_id) else {
            return (MISSING_METHOD_BASE_SCORE, ScoreProvenance::Fallback);
        };
        let w = &self.config.parameters.base;
        let score = w.theory * entry.b_theory
            + w.implementation * entry.b_impl
            + w.deployment * entry.b_deploy;
        (clamp_unit(score), ScoreProvenance::Table)
    }
}

impl LayerEvaluator for BaseLayerEvaluator {
    fn consumer_id(&self) -> &'static str {
        "base"
    }

    fn layer(&self) -> LayerId {
        LayerId::Base
    }

    fn declared_capabilities(&self) -> &'static [EvidenceKind] {
        &[EvidenceKind::MethodId]
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Option<LayerEvaluation> {
        let (score, provenance) = self.score(input.method_id);
        debug!("@b {} = {:.4} ({:?})", input.method_id, score, provenance);

        let mut warnings = Vec::new();
        if provenance == ScoreProvenance::Fallback {
            warnings.push(format!(
                "@b: '{}' not in intrinsic table, using {}",
                input.method_id, MISSING_METHOD_BASE_SCORE
            ));
        }
        Some(LayerEvaluation::new(score, LayerDetail::Lookup { provenance }).with_warnings(warnings))
    }
}
