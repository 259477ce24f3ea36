//! I: indicator table quality
//!
//! ```text
//! I = 0.4·Structure + 0.35·Linkage + 0.25·Logic
//! ```
//!
//! An absent or empty table scores 0.

use super::penalty::is_placeholder;
use crate::config::UnitLayerParams;
use crate::models::IndicatorRow;

/// Structure is capped here when the table has fewer rows than required
const SHORT_TABLE_STRUCTURE_CAP: f64 = 0.3;

/// Bucket the share of filled required fields
fn structure_bucket(completeness: f64) -> f64 {
    if completeness >= 0.9 {
        1.0
    } else if completeness >= 0.7 {
        0.8
    } else if completeness >= 0.5 {
        0.6
    } else {
        0.4
    }
}

fn filled(value: Option<&str>, params: &UnitLayerParams) -> bool {
    !is_placeholder(value, &params.placeholder_markers)
}

fn structure(rows: &[IndicatorRow], params: &UnitLayerParams) -> f64 {
    let fields = &params.indicator_required_fields;
    let total = rows.len() * fields.len();
    let completeness = if total == 0 {
        1.0
    } else {
        let present: usize = rows
            .iter()
            .map(|row| {
                fields
                    .iter()
                    .filter(|f| filled(row.field(f), params))
                    .count()
            })
            .sum();
        present as f64 / total as f64
    };

    let bucket = structure_bucket(completeness);
    if rows.len() < params.min_indicator_rows {
        bucket.min(SHORT_TABLE_STRUCTURE_CAP)
    } else {
        bucket
    }
}

fn linkage(rows: &[IndicatorRow], params: &UnitLayerParams) -> f64 {
    let linked = rows
        .iter()
        .filter(|r| {
            filled(r.strategic_line.as_deref(), params) && filled(r.program.as_deref(), params)
        })
        .count();
    linked as f64 / rows.len() as f64
}

fn baseline_year_in_range(year: Option<&str>, params: &UnitLayerParams) -> bool {
    year.and_then(|y| y.trim().parse::<i32>().ok())
        .map_or(false, |y| (params.baseline_year_min..=params.baseline_year_max).contains(&y))
}

fn logic(rows: &[IndicatorRow], params: &UnitLayerParams) -> f64 {
    let coherent = rows
        .iter()
        .filter(|r| {
            filled(r.baseline_value.as_deref(), params)
                && filled(r.target_value.as_deref(), params)
                && baseline_year_in_range(r.baseline_year.as_deref(), params)
        })
        .count();
    coherent as f64 / rows.len() as f64
}

pub(super) fn indicator_score(rows: &[IndicatorRow], params: &UnitLayerParams) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    0.4 * structure(rows, params) + 0.35 * linkage(rows, params) + 0.25 * logic(rows, params)
}
