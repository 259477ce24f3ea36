//! @q, @d, @p: thin views over the compatibility registry

use super::{CompatibilityRegistry, EvaluationInput, EvidenceKind, LayerEvaluation, LayerEvaluator};
use crate::models::{EvidenceStore, LayerDetail, LayerId, ScoreProvenance};
use std::sync::Arc;
use tracing::debug;

/// Which context id a contextual evaluator reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAxis {
    Question,
    Dimension,
    Policy,
}

impl ContextAxis {
    pub fn layer(&self) -> LayerId {
        match self {
            ContextAxis::Question => LayerId::Question,
            ContextAxis::Dimension => LayerId::Dimension,
            ContextAxis::Policy => LayerId::Policy,
        }
    }

    fn context_id<'a>(&self, evidence: &'a EvidenceStore) -> Option<&'a str> {
        match self {
            ContextAxis::Question => evidence.question_id.as_deref(),
            ContextAxis::Dimension => evidence.dimension_id.as_deref(),
            ContextAxis::Policy => evidence.policy_area_id.as_deref(),
        }
    }
}

pub struct ContextualLayerEvaluator {
    axis: ContextAxis,
    registry: Arc<CompatibilityRegistry>,
}

impl ContextualLayerEvaluator {
    pub fn new(axis: ContextAxis, registry: Arc<CompatibilityRegistry>) -> Self {
        Self { axis, registry }
    }

    pub fn question(registry: Arc<CompatibilityRegistry>) -> Self {
        Self::new(ContextAxis::Question, registry)
    }

    pub fn dimension(registry: Arc<CompatibilityRegistry>) -> Self {
        Self::new(ContextAxis::Dimension, registry)
    }

    pub fn policy(registry: Arc<CompatibilityRegistry>) -> Self {
        Self::new(ContextAxis::Policy, registry)
    }
}

impl LayerEvaluator for ContextualLayerEvaluator {
    fn consumer_id(&self) -> &'static str {
        match self.axis {
            ContextAxis::Question => "question",
            ContextAxis::Dimension => "dimension",
            ContextAxis::Policy => "policy",
        }
    }

    fn layer(&self) -> LayerId {
        self.axis.layer()
    }

    fn declared_capabilities(&self) -> &'static [EvidenceKind] {
        match self.axis {
            ContextAxis::Question => &[EvidenceKind::MethodId, EvidenceKind::QuestionId],
            ContextAxis::Dimension => &[EvidenceKind::MethodId, EvidenceKind::DimensionId],
            ContextAxis::Policy => &[EvidenceKind::MethodId, EvidenceKind::PolicyAreaId],
        }
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Option<LayerEvaluation> {
        let context_id = self.axis.context_id(input.evidence)?;
        let (score, mapped) = match self.axis {
            ContextAxis::Question => (
                self.registry.evaluate_question(input.method_id, context_id),
                self.registry.is_mapped(input.method_id, |m| &m.questions, context_id),
            ),
            ContextAxis::Dimension => (
                self.registry.evaluate_dimension(input.method_id, context_id),
                self.registry.is_mapped(input.method_id, |m| &m.dimensions, context_id),
            ),
            ContextAxis::Policy => (
                self.registry.evaluate_policy(input.method_id, context_id),
                self.registry.is_mapped(input.method_id, |m| &m.policies, context_id),
            ),
        };

        let provenance = if mapped {
            ScoreProvenance::Table
        } else {
            ScoreProvenance::UnmappedPenalty
        };
        debug!(
            "{} {} @ {} = {:.4}",
            self.layer().symbol(),
            input.method_id,
            context_id,
            score
        );
        Some(LayerEvaluation::new(score, LayerDetail::Lookup { provenance }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompatibilityMapping, CompatibilityTable};
    use crate::layers::UNMAPPED_CONTEXT_PENALTY;

    fn registry() -> Arc<CompatibilityRegistry> {
        let mut table = CompatibilityTable::default();
        table.insert(
            "Scorer.run",
            CompatibilityMapping {
                questions: [("Q001".to_string(), 0.8)].into_iter().collect(),
                dimensions: [("D3".to_string(), 0.7)].into_iter().collect(),
                policies: Default::default(),
            },
        );
        Arc::new(CompatibilityRegistry::new(table).unwrap())
    }

    #[test]
    fn test_question_lookup() {
        let evidence = EvidenceStore {
            question_id: Some("Q001".into()),
            ..Default::default()
        };
        let input = EvaluationInput {
            method_id: "Scorer.run",
            role: None,
            evidence: &evidence,
        };
        let eval = ContextualLayerEvaluator::question(registry())
            .evaluate(&input)
            .unwrap();
        assert_eq!(eval.score, 0.8);
    }

    #[test]
    fn test_unmapped_policy_is_penalized() {
        let evidence = EvidenceStore {
            policy_area_id: Some("P9".into()),
            ..Default::default()
        };
        let input = EvaluationInput {
            method_id: "Scorer.run",
            role: None,
            evidence: &evidence,
        };
        let eval = ContextualLayerEvaluator::policy(registry())
            .evaluate(&input)
            .unwrap();
        assert_eq!(eval.score, UNMAPPED_CONTEXT_PENALTY);
        assert_eq!(
            eval.detail,
            LayerDetail::Lookup {
                provenance: ScoreProvenance::UnmappedPenalty
            }
        );
    }

    #[test]
    fn test_missing_context_id_yields_nothing() {
        let evidence = EvidenceStore::default();
        let input = EvaluationInput {
            method_id: "Scorer.run",
            role: None,
            evidence: &evidence,
        };
        let evaluator = ContextualLayerEvaluator::dimension(registry());
        assert!(evaluator.evaluate(&input).is_none());
        assert_eq!(
            evaluator.missing_evidence(&evidence),
            vec![EvidenceKind::DimensionId]
        );
    }
}
