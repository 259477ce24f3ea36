//! Choquet-style fusion of layer scores

use crate::config::{FusionTable, RoleFusionWeights};
use crate::models::{FusionBreakdown, InteractionTerm, LayerId, LinearTerm, RoleTag};
use std::collections::BTreeMap;
use tracing::error;

/// Fuses layer scores with role-specific linear and interaction weights
#[derive(Debug, Clone)]
pub struct ChoquetAggregator {
    fusion: FusionTable,
}

impl ChoquetAggregator {
    pub fn new(fusion: FusionTable) -> Self {
        Self { fusion }
    }

    pub fn weights_for(&self, role: Option<RoleTag>) -> &RoleFusionWeights {
        self.fusion.weights_for(role)
    }

    /// Final fused score in [0, 1]
    pub fn aggregate(&self, role: Option<RoleTag>, scores: &BTreeMap<LayerId, f64>) -> f64 {
        clamp_final(self.aggregate_with_breakdown(role, scores).raw)
    }

    /// Every linear and interaction term, plus the unclamped sum.
    ///
    /// Terms whose layer is missing from `scores` are left out. Scores outside
    /// [0, 1] are logged and clamped before use.
    pub fn aggregate_with_breakdown(
        &self,
        role: Option<RoleTag>,
        scores: &BTreeMap<LayerId, f64>,
    ) -> FusionBreakdown {
        let weights = self.fusion.weights_for(role);
        let score_of = |layer: LayerId| scores.get(&layer).map(|s| checked_score(layer, *s));

        let linear: Vec<LinearTerm> = weights
            .linear
            .iter()
            .filter_map(|(layer, weight)| {
                score_of(*layer).map(|score| LinearTerm {
                    layer: *layer,
                    weight: *weight,
                    score,
                    contribution: weight * score,
                })
            })
            .collect();

        let interactions: Vec<InteractionTerm> = weights
            .interactions
            .iter()
            .filter_map(|term| {
                let (a, b) = term.layers;
                let min_score = score_of(a)?.min(score_of(b)?);
                Some(InteractionTerm {
                    layers: term.layers,
                    weight: term.weight,
                    min_score,
                    contribution: term.weight * min_score,
                })
            })
            .collect();

        let linear_sum: f64 = linear.iter().map(|t| t.contribution).sum();
        let interaction_sum: f64 = interactions.iter().map(|t| t.contribution).sum();

        FusionBreakdown {
            linear,
            interactions,
            linear_sum,
            interaction_sum,
            raw: linear_sum + interaction_sum,
        }
    }
}

fn checked_score(layer: LayerId, score: f64) -> f64 {
    if !(0.0..=1.0).contains(&score) {
        error!("{} score {} outside [0, 1], clamping", layer.symbol(), score);
        return if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
    }
    score
}

/// Clamp a fused sum into [0, 1]
pub fn clamp_final(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}
