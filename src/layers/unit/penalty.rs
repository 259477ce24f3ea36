//! Anti-gaming penalty
//!
//! Documents can fill every cell of their tables with "N/A" and still look
//! structurally complete. The penalty scales with the density of placeholder
//! values in the critical indicator and budget fields, up to the configured cap
//! and never above 0.3.

use crate::config::{UnitLayerParams, MAX_ANTI_GAMING_PENALTY};
use crate::models::PdtStructure;

/// Indicator fields counted by the penalty
const CRITICAL_INDICATOR_FIELDS: &[&str] = &["baseline_value", "target_value", "baseline_year", "source"];

/// Missing, blank, or one of the configured "no data" markers (case-insensitive)
pub fn is_placeholder(value: Option<&str>, markers: &[String]) -> bool {
    let Some(value) = value else {
        return true;
    };
    let normalized = value.trim().to_lowercase();
    normalized.is_empty() || markers.iter().any(|m| m.trim().to_lowercase() == normalized)
}

fn is_placeholder_amount(value: Option<f64>) -> bool {
    value.map_or(true, |v| v == 0.0 || v.is_nan())
}

/// Share of critical fields holding placeholders, in [0, 1]
pub(super) fn placeholder_density(pdt: &PdtStructure, params: &UnitLayerParams) -> f64 {
    let markers = &params.placeholder_markers;
    let mut total = 0usize;
    let mut placeholders = 0usize;

    for row in &pdt.indicator_rows {
        for field in CRITICAL_INDICATOR_FIELDS {
            total += 1;
            if is_placeholder(row.field(field), markers) {
                placeholders += 1;
            }
        }
    }

    for row in &pdt.ppi_rows {
        total += 1;
        if is_placeholder(row.program.as_deref(), markers) {
            placeholders += 1;
        }
        for amount in std::iter::once(row.total_cost).chain(row.allocations.iter().copied()) {
            total += 1;
            if is_placeholder_amount(amount) {
                placeholders += 1;
            }
        }
    }

    if total == 0 {
        return 0.0;
    }
    placeholders as f64 / total as f64
}

pub(super) fn anti_gaming_penalty(density: f64, params: &UnitLayerParams) -> f64 {
    let cap = params.penalty_cap.min(MAX_ANTI_GAMING_PENALTY);
    (params.penalty_scale * density).min(cap).max(0.0)
}
