//! @m: governance and transparency
//!
//! `@m = 0.5·transparency + 0.4·governance + 0.1·cost`, each sub-value
//! falling back to [`DEFAULT_META_SCORE`] when the catalog omits it.

use super::{clamp_unit, EvaluationInput, EvidenceKind, LayerEvaluation, LayerEvaluator};
use crate::config::CalibrationConfig;
use crate::models::{LayerDetail, LayerId, ScoreProvenance};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_META_SCORE: f64 = 0.85;

const TRANSPARENCY_WEIGHT: f64 = 0.5;
const GOVERNANCE_WEIGHT: f64 = 0.4;
const COST_WEIGHT: f64 = 0.1;

pub struct MetaLayerEvaluator {
    config: Arc<CalibrationConfig>,
}

impl MetaLayerEvaluator {
    pub fn new(config: Arc<CalibrationConfig>) -> Self {
        Self { config }
    }

    pub fn score(&self, method_id: &str) -> (f64, ScoreProvenance) {
        let Some(entry) = self.config.catalog.get(method_id) else {
            return (DEFAULT_META_SCORE, ScoreProvenance::Fallback);
        };
        let part = |v: Option<f64>| v.unwrap_or(DEFAULT_META_SCORE);
        let score = TRANSPARENCY_WEIGHT * part(entry.transparency)
            + GOVERNANCE_WEIGHT * part(entry.governance)
            + COST_WEIGHT * part(entry.cost);
        (clamp_unit(score), ScoreProvenance::Table)
    }
}

impl LayerEvaluator for MetaLayerEvaluator {
    fn consumer_id(&self) -> &'static str {
        "meta"
    }

    fn layer(&self) -> LayerId {
        LayerId::Meta
    }

    fn declared_capabilities(&self) -> &'static [EvidenceKind] {
        &[EvidenceKind::MethodId]
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Option<LayerEvaluation> {
        let (score, provenance) = self.score(input.method_id);
        debug!("@m {} = {:.4} ({:?})", input.method_id, score, provenance);
        Some(LayerEvaluation::new(score, LayerDetail::Lookup { provenance }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogEntry, MethodCatalog};

    fn evaluator() -> MetaLayerEvaluator {
        let mut catalog = MethodCatalog::default();
        catalog.insert(
            "Full",
            CatalogEntry {
                congruence: None,
                transparency: Some(1.0),
                governance: Some(0.5),
                cost: Some(0.0),
            },
        );
        catalog.insert(
            "Partial",
            CatalogEntry {
                governance: Some(1.0),
                ..Default::default()
            },
        );
        MetaLayerEvaluator::new(Arc::new(CalibrationConfig::default().with_catalog(catalog)))
    }

    #[test]
    fn test_full_entry() {
        let (score, _) = evaluator().score("Full");
        assert!((score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_partial_entry_fills_defaults() {
        let (score, provenance) = evaluator().score("Partial");
        // 0.5·0.85 + 0.4·1.0 + 0.1·0.85
        assert!((score - 0.91).abs() < 1e-9);
        assert_eq!(provenance, ScoreProvenance::Table);
    }

    #[test]
    fn test_missing_entry() {
        assert_eq!(
            evaluator().score("Unknown"),
            (DEFAULT_META_SCORE, ScoreProvenance::Fallback)
        );
    }
}
