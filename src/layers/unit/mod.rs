//! @u: structural integrity of the source document (PDT)
//!
//! # Formula
//!
//! ```text
//! U_raw   = (S · M · gate(I) · gate(P))^(1/4)
//! U_final = max(0, U_raw − penalty)
//!
//! gate(x) = x if x ≥ threshold else 0
//! penalty = min(cap, scale · placeholder_density)
//! ```
//!
//! | Component | Module |
//! |---|---|
//! | S, block coverage / headers / ordering | `structure` |
//! | M, mandatory sections | `sections` |
//! | I, indicator table | `indicators` |
//! | P, investment plan | `budget` |
//! | anti-gaming penalty | `penalty` |
//!
//! A failed gate zeroes the geometric mean: a document without a usable
//! indicator table or investment plan scores 0 no matter how well written
//! the rest is.

mod budget;
mod indicators;
mod penalty;
mod sections;
mod structure;

pub use penalty::is_placeholder;

use super::{clamp_unit, EvaluationInput, EvidenceKind, LayerEvaluation, LayerEvaluator};
use crate::config::{CalibrationConfig, UnitLayerParams};
use crate::models::{LayerDetail, LayerId, PdtStructure, ScoreProvenance, UnitLayerResult};
use std::sync::Arc;
use tracing::debug;

fn gate(score: f64, threshold: f64) -> (f64, bool) {
    if score >= threshold {
        (score, true)
    } else {
        (0.0, false)
    }
}

/// Score a document structure with the given parameters
pub fn evaluate_pdt(pdt: &PdtStructure, params: &UnitLayerParams) -> UnitLayerResult {
    let (s, structural) = structure::structural_score(pdt, params);
    let m = sections::mandatory_sections_score(pdt, params);
    let i = indicators::indicator_score(&pdt.indicator_rows, params);
    let p = budget::budget_score(&pdt.ppi_rows, params);

    let (gated_i, i_gate_passed) = gate(i, params.indicator_gate);
    let (gated_p, p_gate_passed) = gate(p, params.budget_gate);

    let u_raw = clamp_unit((s * m * gated_i * gated_p).powf(0.25));
    let penalty = penalty::anti_gaming_penalty(penalty::placeholder_density(pdt, params), params);
    let u_final = (u_raw - penalty).max(0.0);

    UnitLayerResult {
        s,
        m,
        i,
        p,
        i_gate_passed,
        p_gate_passed,
        structural,
        u_raw,
        penalty,
        u_final,
    }
}

pub struct UnitLayerEvaluator {
    config: Arc<CalibrationConfig>,
}

impl UnitLayerEvaluator {
    pub fn new(config: Arc<CalibrationConfig>) -> Self {
        Self { config }
    }

    pub fn evaluate_structure(&self, pdt: &PdtStructure) -> UnitLayerResult {
        evaluate_pdt(pdt, &self.config.parameters.unit)
    }
}

impl LayerEvaluator for UnitLayerEvaluator {
    fn consumer_id(&self) -> &'static str {
        "unit"
    }

    fn layer(&self) -> LayerId {
        LayerId::Unit
    }

    fn declared_capabilities(&self) -> &'static [EvidenceKind] {
        &[EvidenceKind::DocumentEvidence]
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Option<LayerEvaluation> {
        if let Some(pdt) = &input.evidence.pdt_structure {
            let result = self.evaluate_structure(pdt);
            debug!(
                "@u S={:.3} M={:.3} I={:.3} P={:.3} raw={:.3} penalty={:.3} final={:.3}",
                result.s, result.m, result.i, result.p, result.u_raw, result.penalty, result.u_final
            );

            let mut warnings = Vec::new();
            if !result.i_gate_passed {
                warnings.push(format!(
                    "@u: indicator gate failed (I = {:.3} < {})",
                    result.i, self.config.parameters.unit.indicator_gate
                ));
            }
            if !result.p_gate_passed {
                warnings.push(format!(
                    "@u: budget gate failed (P = {:.3} < {})",
                    result.p, self.config.parameters.unit.budget_gate
                ));
            }
            return Some(
                LayerEvaluation::new(result.u_final, LayerDetail::Unit(result))
                    .with_warnings(warnings),
            );
        }

        let quality = input.evidence.document_quality?;
        debug!("@u precomputed document quality {:.3}", quality);
        Some(LayerEvaluation::new(
            clamp_unit(quality),
            LayerDetail::Lookup {
                provenance: ScoreProvenance::Precomputed,
            },
        ))
    }
}
