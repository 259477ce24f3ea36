//! Method↔context compatibility registry
//!
//! Backs the @q, @d and @p layers. The table is loaded once, checked against
//! the anti-universality invariant, and never mutated afterwards; reloading
//! means building a new registry.

use crate::config::{CompatibilityMapping, CompatibilityTable};
use crate::error::{CalResult, CalibrationError};
use std::collections::BTreeMap;
use tracing::debug;

/// Score for a (method, context) pair absent from the table.
/// Signals "declared incompatible": never zero, never the @b default.
pub const UNMAPPED_CONTEXT_PENALTY: f64 = 0.1;

/// A method whose best score exceeds this on all three axes claims
/// universal competence and is rejected at load time.
pub const UNIVERSALITY_THRESHOLD: f64 = 0.9;

/// Immutable compatibility lookups
#[derive(Debug, Clone, Default)]
pub struct CompatibilityRegistry {
    table: CompatibilityTable,
}

impl CompatibilityRegistry {
    /// Validate and take ownership of a compatibility table
    pub fn new(table: CompatibilityTable) -> CalResult<Self> {
        Self::validate_table(&table)?;
        debug!(
            "Compatibility registry ready: {} methods (version {})",
            table.len(),
            table.version.as_deref().unwrap_or("unversioned")
        );
        Ok(Self { table })
    }

    /// Load-time structural checks: score range and anti-universality
    pub fn validate_table(table: &CompatibilityTable) -> CalResult<()> {
        for (method_id, mapping) in &table.methods {
            for (axis, scores) in [
                ("questions", &mapping.questions),
                ("dimensions", &mapping.dimensions),
                ("policies", &mapping.policies),
            ] {
                if let Some((ctx, score)) = scores
                    .iter()
                    .find(|(_, s)| !(0.0..=1.0).contains(*s) || s.is_nan())
                {
                    return Err(CalibrationError::integrity(
                        "compatibility",
                        format!(
                            "method '{}' has {} score {} for '{}' outside [0, 1]",
                            method_id, axis, score, ctx
                        ),
                    ));
                }
            }

            if is_universal(mapping) {
                return Err(CalibrationError::integrity(
                    "compatibility",
                    format!(
                        "method '{}' claims universal competence (max > {} on questions, dimensions and policies)",
                        method_id, UNIVERSALITY_THRESHOLD
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn evaluate_question(&self, method_id: &str, question_id: &str) -> f64 {
        self.lookup(method_id, |m| &m.questions, question_id)
    }

    pub fn evaluate_dimension(&self, method_id: &str, dimension_id: &str) -> f64 {
        self.lookup(method_id, |m| &m.dimensions, dimension_id)
    }

    pub fn evaluate_policy(&self, method_id: &str, policy_id: &str) -> f64 {
        self.lookup(method_id, |m| &m.policies, policy_id)
    }

    /// Whether the pair is present in the table
    pub fn is_mapped(
        &self,
        method_id: &str,
        axis: impl Fn(&CompatibilityMapping) -> &BTreeMap<String, f64>,
        context_id: &str,
    ) -> bool {
        self.table
            .get(method_id)
            .map_or(false, |m| axis(m).contains_key(context_id))
    }

    fn lookup(
        &self,
        method_id: &str,
        axis: impl Fn(&CompatibilityMapping) -> &BTreeMap<String, f64>,
        context_id: &str,
    ) -> f64 {
        self.table
            .get(method_id)
            .and_then(|m| axis(m).get(context_id).copied())
            .unwrap_or(UNMAPPED_CONTEXT_PENALTY)
    }
}

fn axis_max(scores: &BTreeMap<String, f64>) -> f64 {
    scores.values().copied().fold(0.0, f64::max)
}

fn is_universal(mapping: &CompatibilityMapping) -> bool {
    axis_max(&mapping.questions) > UNIVERSALITY_THRESHOLD
        && axis_max(&mapping.dimensions) > UNIVERSALITY_THRESHOLD
        && axis_max(&mapping.policies) > UNIVERSALITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(q: f64, d: f64, p: f64) -> CompatibilityMapping {
        CompatibilityMapping {
            questions: [("Q001".to_string(), q)].into_iter().collect(),
            dimensions: [("D1".to_string(), d)].into_iter().collect(),
            policies: [("P1".to_string(), p)].into_iter().collect(),
        }
    }

    fn registry() -> CompatibilityRegistry {
        let mut table = CompatibilityTable::default();
        table.insert("Scorer.run", mapping(0.95, 0.95, 0.4));
        CompatibilityRegistry::new(table).unwrap()
    }

    #[test]
    fn test_mapped_lookups() {
        let reg = registry();
        assert_eq!(reg.evaluate_question("Scorer.run", "Q001"), 0.95);
        assert_eq!(reg.evaluate_dimension("Scorer.run", "D1"), 0.95);
        assert_eq!(reg.evaluate_policy("Scorer.run", "P1"), 0.4);
        assert!(reg.is_mapped("Scorer.run", |m| &m.questions, "Q001"));
    }

    #[test]
    fn test_unmapped_pairs_get_penalty() {
        let reg = registry();
        assert_eq!(reg.evaluate_question("Scorer.run", "Q999"), UNMAPPED_CONTEXT_PENALTY);
        assert_eq!(reg.evaluate_policy("Unknown.method", "P1"), UNMAPPED_CONTEXT_PENALTY);
        assert!(!reg.is_mapped("Unknown.method", |m| &m.policies, "P1"));
    }

    #[test]
    fn test_universal_method_rejected() {
        let mut table = CompatibilityTable::default();
        table.insert("Omni", mapping(0.91, 0.95, 1.0));
        let err = CompatibilityRegistry::new(table).unwrap_err();
        assert!(err.to_string().contains("Omni"));
        assert!(err.to_string().contains("universal"));
    }

    #[test]
    fn test_threshold_is_strict() {
        // Exactly 0.9 on every axis is not "greater than" the threshold
        let mut table = CompatibilityTable::default();
        table.insert("Edge", mapping(0.9, 0.9, 0.9));
        assert!(CompatibilityRegistry::new(table).is_ok());
    }

    #[test]
    fn test_two_high_axes_allowed() {
        let mut table = CompatibilityTable::default();
        table.insert("Broad", mapping(1.0, 1.0, 0.2));
        assert!(CompatibilityRegistry::new(table).is_ok());
    }

    #[test]
    fn test_empty_axis_is_not_universal() {
        let mut table = CompatibilityTable::default();
        let mut m = mapping(1.0, 1.0, 1.0);
        m.policies.clear();
        table.insert("NoPolicies", m);
        assert!(CompatibilityRegistry::new(table).is_ok());
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let mut table = CompatibilityTable::default();
        table.insert("Broken", mapping(1.4, 0.2, 0.2));
        let err = CompatibilityRegistry::new(table).unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));
    }
}
