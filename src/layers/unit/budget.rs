//! P: multi-year investment plan (PPI) quality
//!
//! ```text
//! P = 0.2·RowPresence + 0.4·FieldStructure + 0.4·AccountingConsistency
//! ```

use super::penalty::is_placeholder;
use crate::config::UnitLayerParams;
use crate::models::BudgetRow;

const ROW_PRESENCE_WEIGHT: f64 = 0.2;
const FIELD_STRUCTURE_WEIGHT: f64 = 0.4;
const ACCOUNTING_WEIGHT: f64 = 0.4;

/// program, funding source, total, four allocations
const FIELDS_PER_ROW: usize = 7;

fn row_presence(rows: &[BudgetRow], params: &UnitLayerParams) -> f64 {
    if params.min_ppi_rows == 0 {
        return 1.0;
    }
    (rows.len() as f64 / params.min_ppi_rows as f64).min(1.0)
}

fn filled_fields(row: &BudgetRow, params: &UnitLayerParams) -> usize {
    let text = [row.program.as_deref(), row.funding_source.as_deref()]
        .into_iter()
        .filter(|v| !is_placeholder(*v, &params.placeholder_markers))
        .count();
    let amounts = std::iter::once(row.total_cost)
        .chain(row.allocations.iter().copied())
        .filter(Option::is_some)
        .count();
    text + amounts
}

fn field_structure(rows: &[BudgetRow], params: &UnitLayerParams) -> f64 {
    let filled: usize = rows.iter().map(|r| filled_fields(r, params)).sum();
    filled as f64 / (rows.len() * FIELDS_PER_ROW) as f64
}

/// Allocations sum to the declared total within the relative tolerance
pub(super) fn is_consistent(row: &BudgetRow, tolerance: f64) -> bool {
    let Some(total) = row.total_cost else {
        return false;
    };
    if total <= 0.0 {
        return false;
    }
    let sum: f64 = row.allocations.iter().map(|a| a.unwrap_or(0.0)).sum();
    (sum - total).abs() <= tolerance * total
}

fn accounting_consistency(rows: &[BudgetRow], params: &UnitLayerParams) -> f64 {
    let consistent = rows
        .iter()
        .filter(|r| is_consistent(r, params.accounting_tolerance))
        .count();
    consistent as f64 / rows.len() as f64
}

pub(super) fn budget_score(rows: &[BudgetRow], params: &UnitLayerParams) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    ROW_PRESENCE_WEIGHT * row_presence(rows, params)
        + FIELD_STRUCTURE_WEIGHT * field_structure(rows, params)
        + ACCOUNTING_WEIGHT * accounting_consistency(rows, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(total: f64, allocations: [f64; 4]) -> BudgetRow {
        BudgetRow {
            program: Some("Vías rurales".into()),
            funding_source: Some("SGP".into()),
            total_cost: Some(total),
            allocations: allocations.map(Some),
        }
    }

    #[test]
    fn test_within_one_percent_is_consistent() {
        let r = row(
            1_000_000_000.0,
            [250_000_000.0, 250_000_000.0, 250_000_000.0, 249_000_000.0],
        );
        assert!(is_consistent(&r, 0.01));
    }

    #[test]
    fn test_outside_tolerance_is_inconsistent() {
        let r = row(1_000.0, [200.0, 200.0, 200.0, 200.0]);
        assert!(!is_consistent(&r, 0.01));
    }

    #[test]
    fn test_zero_total_is_inconsistent() {
        let r = row(0.0, [0.0; 4]);
        assert!(!is_consistent(&r, 0.01));
    }

    #[test]
    fn test_complete_plan() {
        let rows = vec![row(400.0, [100.0; 4]); 3];
        let p = budget_score(&rows, &UnitLayerParams::default());
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sparse_plan() {
        let rows = vec![BudgetRow {
            program: Some("Agua potable".into()),
            ..Default::default()
        }];
        let p = budget_score(&rows, &UnitLayerParams::default());
        // 0.2·(1/3) + 0.4·(1/7) + 0
        let expected = 0.2 / 3.0 + 0.4 / 7.0;
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn test_empty_plan_is_zero() {
        assert_eq!(budget_score(&[], &UnitLayerParams::default()), 0.0);
    }
}
