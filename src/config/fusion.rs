//! Role-specific fusion weights
//!
//! ```toml
//! [fusion.roles.SCORE_Q]
//! linear = { base = 0.17, chain = 0.13, question = 0.08 }
//! interactions = [{ layers = ["unit", "chain"], weight = 0.13 }]
//! congruence = 0.8
//! ```
//!
//! For every role, `Σ linear + Σ interaction` must equal 1.0 and every
//! referenced layer must belong to the role's layer set. Roles missing from
//! the file keep their built-in weights.

use crate::error::{CalResult, CalibrationError};
use crate::models::{LayerId, RoleTag};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tolerance for the weights-sum-to-one check
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Synergy weight between two layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionWeight {
    pub layers: (LayerId, LayerId),
    pub weight: f64,
}

/// Capacity for one role: linear weights plus pairwise interactions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleFusionWeights {
    pub linear: BTreeMap<LayerId, f64>,
    pub interactions: Vec<InteractionWeight>,
    /// Role-level congruence value used by @C when the catalog is silent
    pub congruence: Option<f64>,
}

impl RoleFusionWeights {
    fn new(linear: &[(LayerId, f64)], interactions: &[(LayerId, LayerId, f64)]) -> Self {
        Self {
            linear: linear.iter().copied().collect(),
            interactions: interactions
                .iter()
                .map(|&(a, b, weight)| InteractionWeight {
                    layers: (a, b),
                    weight,
                })
                .collect(),
            congruence: None,
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.linear.values().sum::<f64>() + self.interactions.iter().map(|i| i.weight).sum::<f64>()
    }

    /// Layers referenced by any term
    pub fn referenced_layers(&self) -> BTreeSet<LayerId> {
        let mut layers: BTreeSet<LayerId> = self.linear.keys().copied().collect();
        for i in &self.interactions {
            layers.insert(i.layers.0);
            layers.insert(i.layers.1);
        }
        layers
    }

    fn validate(&self, label: &str, allowed: &BTreeSet<LayerId>) -> CalResult<()> {
        for (layer, w) in &self.linear {
            if *w < 0.0 || w.is_nan() {
                return Err(CalibrationError::integrity(
                    "fusion",
                    format!("{}: negative linear weight {} for {}", label, w, layer),
                ));
            }
        }
        for i in &self.interactions {
            if i.weight < 0.0 || i.weight.is_nan() {
                return Err(CalibrationError::integrity(
                    "fusion",
                    format!(
                        "{}: negative interaction weight {} for ({}, {})",
                        label, i.weight, i.layers.0, i.layers.1
                    ),
                ));
            }
            if i.layers.0 == i.layers.1 {
                return Err(CalibrationError::integrity(
                    "fusion",
                    format!("{}: interaction pairs {} with itself", label, i.layers.0),
                ));
            }
        }
        if let Some(stray) = self.referenced_layers().difference(allowed).next() {
            return Err(CalibrationError::integrity(
                "fusion",
                format!("{}: weight references layer {} outside the role's layer set", label, stray),
            ));
        }
        if let Some(c) = self.congruence {
            if !(0.0..=1.0).contains(&c) {
                return Err(CalibrationError::integrity(
                    "fusion",
                    format!("{}: congruence {} outside [0, 1]", label, c),
                ));
            }
        }
        let total = self.total_weight();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CalibrationError::integrity(
                "fusion",
                format!(
                    "{}: linear + interaction weights sum to {:.6}, expected 1.0",
                    label, total
                ),
            ));
        }
        Ok(())
    }
}

/// Fusion weights for every role plus the core fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionTable {
    pub roles: BTreeMap<RoleTag, RoleFusionWeights>,
    /// Used when the role could not be resolved (full eight-layer set)
    pub core: RoleFusionWeights,
}

impl Default for FusionTable {
    fn default() -> Self {
        use LayerId::*;

        let score_q = RoleFusionWeights::new(
            &[
                (Base, 0.17),
                (Chain, 0.13),
                (Question, 0.08),
                (Dimension, 0.07),
                (Policy, 0.06),
                (Congruence, 0.08),
                (Unit, 0.04),
                (Meta, 0.04),
            ],
            &[
                (Unit, Chain, 0.13),
                (Chain, Congruence, 0.10),
                (Question, Dimension, 0.10),
            ],
        );
        let ingest = RoleFusionWeights::new(
            &[(Base, 0.30), (Chain, 0.20), (Unit, 0.25), (Meta, 0.10)],
            &[(Unit, Chain, 0.15)],
        );
        let aggregate = RoleFusionWeights::new(
            &[
                (Base, 0.25),
                (Chain, 0.20),
                (Dimension, 0.15),
                (Policy, 0.10),
                (Congruence, 0.10),
                (Meta, 0.05),
            ],
            &[(Chain, Congruence, 0.10), (Dimension, Policy, 0.05)],
        );
        let report = RoleFusionWeights::new(
            &[(Base, 0.35), (Chain, 0.25), (Congruence, 0.20), (Meta, 0.10)],
            &[(Chain, Congruence, 0.10)],
        );
        let tooling = RoleFusionWeights::new(
            &[(Base, 0.45), (Chain, 0.35), (Meta, 0.10)],
            &[(Base, Chain, 0.10)],
        );

        let mut roles = BTreeMap::new();
        roles.insert(RoleTag::IngestPdm, ingest.clone());
        roles.insert(RoleTag::Structure, ingest.clone());
        roles.insert(RoleTag::Extract, ingest);
        roles.insert(RoleTag::ScoreQ, score_q.clone());
        roles.insert(RoleTag::Aggregate, aggregate);
        roles.insert(RoleTag::Report, report);
        roles.insert(RoleTag::MetaTool, tooling.clone());
        roles.insert(RoleTag::Transform, tooling);

        Self { roles, core: score_q }
    }
}

impl FusionTable {
    /// Weights for a role, or the core set when the role is unresolved
    pub fn weights_for(&self, role: Option<RoleTag>) -> &RoleFusionWeights {
        role.and_then(|r| self.roles.get(&r)).unwrap_or(&self.core)
    }

    pub fn validate(&self) -> CalResult<()> {
        for role in RoleTag::ALL {
            let weights = self.roles.get(&role).ok_or_else(|| {
                CalibrationError::integrity("fusion", format!("no weights for role {}", role))
            })?;
            weights.validate(role.name(), &role.layer_set())?;
        }
        self.core.validate("core", &LayerId::core_set())
    }

    /// Build from the raw file form, keeping built-in weights for roles the
    /// file does not mention
    pub(crate) fn from_raw(raw: RawFusionConfig) -> CalResult<Self> {
        let mut table = FusionTable::default();
        for (name, raw_role) in raw.roles {
            let role: RoleTag = name
                .parse()
                .map_err(|e: String| CalibrationError::integrity("fusion", e))?;
            table.roles.insert(role, raw_role.into_typed(&name)?);
        }
        if let Some(core) = raw.core {
            table.core = core.into_typed("core")?;
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawFusionConfig {
    #[serde(default)]
    roles: BTreeMap<String, RawRoleFusion>,
    #[serde(default)]
    core: Option<RawRoleFusion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawRoleFusion {
    #[serde(default)]
    linear: BTreeMap<String, f64>,
    #[serde(default)]
    interactions: Vec<RawInteraction>,
    #[serde(default)]
    congruence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawInteraction {
    layers: [String; 2],
    weight: f64,
}

fn parse_layer(label: &str, name: &str) -> CalResult<LayerId> {
    name.parse()
        .map_err(|e: String| CalibrationError::integrity("fusion", format!("{}: {}", label, e)))
}

impl RawRoleFusion {
    fn into_typed(self, label: &str) -> CalResult<RoleFusionWeights> {
        let mut linear = BTreeMap::new();
        for (name, weight) in self.linear {
            linear.insert(parse_layer(label, &name)?, weight);
        }
        let mut interactions = Vec::with_capacity(self.interactions.len());
        for raw in self.interactions {
            let [a, b] = raw.layers;
            interactions.push(InteractionWeight {
                layers: (parse_layer(label, &a)?, parse_layer(label, &b)?),
                weight: raw.weight,
            });
        }
        Ok(RoleFusionWeights {
            linear,
            interactions,
            congruence: self.congruence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let table = FusionTable::default();
        table.validate().expect("built-in weights must validate");
        for role in RoleTag::ALL {
            let total = table.weights_for(Some(role)).total_weight();
            assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", role, total);
        }
    }

    #[test]
    fn test_unresolved_role_uses_core() {
        let table = FusionTable::default();
        assert_eq!(table.weights_for(None), &table.core);
        assert_eq!(table.core.referenced_layers(), LayerId::core_set());
    }

    #[test]
    fn test_from_raw_overrides_one_role() {
        let raw: RawFusionConfig = toml::from_str(
            r#"
            [roles.REPORT]
            linear = { base = 0.5, chain = 0.3, meta = 0.2 }
            congruence = 0.75
            "#,
        )
        .unwrap();
        let table = FusionTable::from_raw(raw).unwrap();
        let report = table.weights_for(Some(RoleTag::Report));
        assert_eq!(report.linear.get(&LayerId::Base), Some(&0.5));
        assert!(report.interactions.is_empty());
        assert_eq!(report.congruence, Some(0.75));
        // Untouched roles keep built-in weights
        assert_eq!(
            table.weights_for(Some(RoleTag::ScoreQ)),
            FusionTable::default().weights_for(Some(RoleTag::ScoreQ))
        );
        table.validate().unwrap();
    }

    #[test]
    fn test_weights_not_summing_to_one_rejected() {
        let raw: RawFusionConfig = toml::from_str(
            r#"
            [roles.TRANSFORM]
            linear = { base = 0.5, chain = 0.3 }
            "#,
        )
        .unwrap();
        let table = FusionTable::from_raw(raw).unwrap();
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("TRANSFORM"));
        assert!(err.to_string().contains("expected 1.0"));
    }

    #[test]
    fn test_layer_outside_role_rejected() {
        let raw: RawFusionConfig = toml::from_str(
            r#"
            [roles.META_TOOL]
            linear = { base = 0.5, chain = 0.3, unit = 0.2 }
            "#,
        )
        .unwrap();
        let err = FusionTable::from_raw(raw).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("outside the role's layer set"));
    }

    #[test]
    fn test_unknown_role_or_layer_name_rejected() {
        let raw: RawFusionConfig = toml::from_str(
            r#"
            [roles.EXECUTOR]
            linear = { base = 1.0 }
            "#,
        )
        .unwrap();
        assert!(FusionTable::from_raw(raw).is_err());

        let raw: RawFusionConfig = toml::from_str(
            r#"
            [roles.REPORT]
            linear = { bogus = 1.0 }
            "#,
        )
        .unwrap();
        assert!(FusionTable::from_raw(raw).is_err());
    }

    #[test]
    fn test_interaction_parsing() {
        let raw: RawFusionConfig = toml::from_str(
            r#"
            [roles.META_TOOL]
            linear = { base = 0.4, chain = 0.4 }
            interactions = [{ layers = ["@b", "@chain"], weight = 0.2 }]
            "#,
        )
        .unwrap();
        let table = FusionTable::from_raw(raw).unwrap();
        let w = table.weights_for(Some(RoleTag::MetaTool));
        assert_eq!(w.interactions[0].layers, (LayerId::Base, LayerId::Chain));
        table.validate().unwrap();
    }
}
