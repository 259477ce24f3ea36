//! Calibration orchestrator
//!
//! One linear pass per call:
//!
//! ```text
//! Resolved ──► Evaluated ──► Validated ──► Aggregated
//!  role &       only the      required ⊆     Choquet fusion,
//!  layer set    required      computed       result + metadata
//!               layers
//! ```
//!
//! The orchestrator holds only immutable state and is shared across threads
//! behind an `Arc`.

use super::resolver::{LayerRequirementsResolver, RoleResolution};
use crate::config::CalibrationConfig;
use crate::error::{CalResult, CalibrationError};
use crate::layers::{
    BaseLayerEvaluator, ChainLayerEvaluator, CompatibilityRegistry, CongruenceLayerEvaluator,
    ContextualLayerEvaluator, EvaluationInput, LayerEvaluator, MetaLayerEvaluator,
    UnitLayerEvaluator,
};
use crate::models::{
    CalibrationMetadata, CalibrationResult, CalibrationSubject, ChainSequenceReport,
    EvidenceStore, LayerDetail, LayerId, QualityBand, RoleSource,
};
use crate::scoring::{clamp_final, ChoquetAggregator};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Stage reached by a calibration call, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStage {
    Resolved,
    Evaluated,
    Validated,
    Aggregated,
}

impl std::fmt::Display for CalibrationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationStage::Resolved => write!(f, "resolved"),
            CalibrationStage::Evaluated => write!(f, "evaluated"),
            CalibrationStage::Validated => write!(f, "validated"),
            CalibrationStage::Aggregated => write!(f, "aggregated"),
        }
    }
}

pub struct CalibrationOrchestrator {
    config: Arc<CalibrationConfig>,
    fingerprint: String,
    resolver: LayerRequirementsResolver,
    /// Same instance as the @chain entry in `evaluators`
    chain: Arc<ChainLayerEvaluator>,
    evaluators: BTreeMap<LayerId, Arc<dyn LayerEvaluator>>,
    aggregator: ChoquetAggregator,
}

impl CalibrationOrchestrator {
    /// Validate the configuration and wire up one evaluator per layer
    pub fn new(config: Arc<CalibrationConfig>) -> CalResult<Self> {
        config.validate()?;
        let registry = Arc::new(CompatibilityRegistry::new(config.compatibility.clone())?);

        let chain = Arc::new(ChainLayerEvaluator::new(Arc::clone(&config)));
        let evaluators: Vec<Arc<dyn LayerEvaluator>> = vec![
            Arc::new(BaseLayerEvaluator::new(Arc::clone(&config))),
            Arc::clone(&chain) as Arc<dyn LayerEvaluator>,
            Arc::new(UnitLayerEvaluator::new(Arc::clone(&config))),
            Arc::new(ContextualLayerEvaluator::question(Arc::clone(&registry))),
            Arc::new(ContextualLayerEvaluator::dimension(Arc::clone(&registry))),
            Arc::new(ContextualLayerEvaluator::policy(registry)),
            Arc::new(CongruenceLayerEvaluator::new(Arc::clone(&config))),
            Arc::new(MetaLayerEvaluator::new(Arc::clone(&config))),
        ];
        let evaluators: BTreeMap<LayerId, Arc<dyn LayerEvaluator>> =
            evaluators.into_iter().map(|e| (e.layer(), e)).collect();

        let fingerprint = config.fingerprint();
        debug!(
            "Orchestrator ready with {} evaluators (config {})",
            evaluators.len(),
            &fingerprint[..12]
        );

        Ok(Self {
            resolver: LayerRequirementsResolver::new(Arc::clone(&config)),
            chain,
            aggregator: ChoquetAggregator::new(config.parameters.fusion.clone()),
            evaluators,
            fingerprint,
            config,
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// SHA-256 of the configuration, recorded in every result
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn resolve(&self, subject: &CalibrationSubject) -> RoleResolution {
        self.resolver.resolve(subject)
    }

    pub fn get_required_layers(&self, method_id: &str) -> BTreeSet<LayerId> {
        self.resolver.get_required_layers(method_id)
    }

    /// Calibrate one method invocation
    pub fn calibrate(
        &self,
        subject: &CalibrationSubject,
        evidence: &EvidenceStore,
    ) -> CalResult<CalibrationResult> {
        let method_id = subject.method_id.as_str();
        let mut warnings = Vec::new();

        // Resolve
        let resolution = self.resolver.resolve(subject);
        match resolution.source {
            RoleSource::Inferred => warnings.push(format!(
                "role {} inferred from method name",
                resolution.role_label()
            )),
            RoleSource::Fallback => {
                warnings.push("role unresolved, core layer set applied".to_string())
            }
            RoleSource::Subject | RoleSource::Declared => {}
        }
        self.log_stage(method_id, CalibrationStage::Resolved);

        if resolution.layers.contains(&LayerId::Chain)
            && self.config.parameters.chain.strict_signatures
            && !self.chain.has_signature(method_id)
        {
            return Err(CalibrationError::UnknownMethodSignature {
                method_id: method_id.to_string(),
            });
        }

        // Evaluate
        let input = EvaluationInput {
            method_id,
            role: resolution.role,
            evidence,
        };
        let mut layer_scores = BTreeMap::new();
        let mut layer_details = BTreeMap::new();
        for layer in &resolution.layers {
            let Some(evaluator) = self.evaluators.get(layer) else {
                continue;
            };
            match evaluator.evaluate(&input) {
                Some(evaluation) => {
                    check_range(*layer, evaluation.score);
                    layer_scores.insert(*layer, evaluation.score);
                    layer_details.insert(*layer, evaluation.detail);
                    warnings.extend(evaluation.warnings);
                }
                None => {
                    let missing: Vec<&str> = evaluator
                        .missing_evidence(evidence)
                        .iter()
                        .map(|k| k.name())
                        .collect();
                    debug!(
                        "{} skipped for {}: evidence lacks {}",
                        evaluator.consumer_id(),
                        method_id,
                        missing.join(", ")
                    );
                }
            }
        }
        self.log_stage(method_id, CalibrationStage::Evaluated);

        // Validate completeness
        let computed: BTreeSet<LayerId> = layer_scores.keys().copied().collect();
        let missing: Vec<LayerId> = resolution.layers.difference(&computed).copied().collect();
        if !missing.is_empty() {
            return Err(CalibrationError::CompletenessViolation {
                method_id: method_id.to_string(),
                role: resolution.role_label(),
                missing,
            });
        }
        self.log_stage(method_id, CalibrationStage::Validated);

        // Aggregate
        let fusion = self
            .aggregator
            .aggregate_with_breakdown(resolution.role, &layer_scores);
        let final_score = clamp_final(fusion.raw);
        self.log_stage(method_id, CalibrationStage::Aggregated);

        let quality_band = QualityBand::from_score(final_score);
        info!(
            "Calibrated {} as {}: {:.4} ({})",
            method_id,
            resolution.role_label(),
            final_score,
            quality_band
        );

        Ok(CalibrationResult {
            method_id: method_id.to_string(),
            role: resolution.role,
            final_score,
            layer_scores,
            active_layers: computed,
            metadata: CalibrationMetadata {
                role_source: resolution.source,
                config_fingerprint: self.fingerprint.clone(),
                quality_band,
                fusion,
                layer_details,
                warnings,
                context: subject.context.clone(),
            },
        })
    }

    /// Calibrate independent invocations in parallel; results keep input order
    pub fn calibrate_batch(
        &self,
        items: &[(CalibrationSubject, EvidenceStore)],
    ) -> Vec<CalResult<CalibrationResult>> {
        items
            .par_iter()
            .map(|(subject, evidence)| self.calibrate(subject, evidence))
            .collect()
    }

    /// Validate an ordered method sequence with weakest-link quality
    pub fn evaluate_chain_sequence(
        &self,
        methods: &[String],
        initial_inputs: &BTreeSet<String>,
        declared_outputs: &BTreeMap<String, Vec<String>>,
    ) -> ChainSequenceReport {
        let report = self
            .chain
            .evaluate_sequence(methods, initial_inputs, declared_outputs);
        info!(
            "Chain of {} methods: quality {:.2}, weakest link {}",
            methods.len(),
            report.chain_quality,
            report.weakest_link.as_deref().unwrap_or("-")
        );
        report
    }

    fn log_stage(&self, method_id: &str, stage: CalibrationStage) {
        debug!("{}: {}", method_id, stage);
    }
}

fn check_range(layer: LayerId, score: f64) {
    if !(0.0..=1.0).contains(&score) {
        error!("{} produced out-of-range score {}", layer.symbol(), score);
        debug_assert!(false, "{} score {} outside [0, 1]", layer.symbol(), score);
    }
}

/// Detail for one layer, if it was computed
pub fn layer_detail(result: &CalibrationResult, layer: LayerId) -> Option<&LayerDetail> {
    result.metadata.layer_details.get(&layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CalibrationParameters, IntrinsicEntry, IntrinsicTable, MethodSignature, SignatureTable,
    };
    use crate::models::RoleTag;

    fn config(strict: bool) -> Arc<CalibrationConfig> {
        let mut intrinsic = IntrinsicTable::default();
        intrinsic.insert(
            "Tool.run",
            IntrinsicEntry {
                role: Some("META_TOOL".into()),
                b_theory: 1.0,
                b_impl: 1.0,
                b_deploy: 1.0,
            },
        );
        intrinsic.insert(
            "Ghost.run",
            IntrinsicEntry {
                role: Some("META_TOOL".into()),
                b_theory: 1.0,
                b_impl: 1.0,
                b_deploy: 1.0,
            },
        );
        let mut signatures = SignatureTable::default();
        signatures.insert("Tool.run", MethodSignature::new(["input"]));

        let mut params = CalibrationParameters::default();
        params.chain.strict_signatures = strict;
        Arc::new(
            CalibrationConfig::default()
                .with_parameters(params)
                .with_intrinsic(intrinsic)
                .with_signatures(signatures),
        )
    }

    fn evidence(inputs: &[&str]) -> EvidenceStore {
        EvidenceStore {
            available_inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_meta_tool_calibration() {
        let orch = CalibrationOrchestrator::new(config(true)).unwrap();
        let result = orch
            .calibrate(&CalibrationSubject::new("Tool.run"), &evidence(&["input"]))
            .unwrap();

        assert_eq!(result.role, Some(RoleTag::MetaTool));
        assert_eq!(result.active_layers, RoleTag::MetaTool.layer_set());
        assert_eq!(
            result.active_layers,
            result.layer_scores.keys().copied().collect::<BTreeSet<_>>()
        );
        // @b 1.0, @chain 1.0, @m 0.85: 0.45 + 0.35 + 0.085 + 0.10
        assert!((result.final_score - 0.985).abs() < 1e-9);
        assert_eq!(result.metadata.quality_band, QualityBand::Excellent);
        assert!(matches!(
            layer_detail(&result, LayerId::Chain),
            Some(LayerDetail::Chain(_))
        ));
    }

    #[test]
    fn test_strict_unknown_signature_is_error() {
        let orch = CalibrationOrchestrator::new(config(true)).unwrap();
        let err = orch
            .calibrate(&CalibrationSubject::new("Ghost.run"), &evidence(&[]))
            .unwrap_err();
        assert!(matches!(err, CalibrationError::UnknownMethodSignature { .. }));
    }

    #[test]
    fn test_lenient_unknown_signature_scores_zero() {
        let orch = CalibrationOrchestrator::new(config(false)).unwrap();
        let result = orch
            .calibrate(&CalibrationSubject::new("Ghost.run"), &evidence(&[]))
            .unwrap();
        assert_eq!(result.layer_scores[&LayerId::Chain], 0.0);
        assert!(result
            .metadata
            .warnings
            .iter()
            .any(|w| w.contains("no signature")));
    }

    #[test]
    fn test_missing_context_is_completeness_violation() {
        let orch = CalibrationOrchestrator::new(config(false)).unwrap();
        let subject = CalibrationSubject::new("Tool.run").with_role(RoleTag::Aggregate);
        let err = orch.calibrate(&subject, &evidence(&["input"])).unwrap_err();
        match err {
            CalibrationError::CompletenessViolation {
                method_id,
                role,
                missing,
            } => {
                assert_eq!(method_id, "Tool.run");
                assert_eq!(role, "AGGREGATE");
                assert_eq!(missing, vec![LayerId::Dimension, LayerId::Policy]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_batch_keeps_order() {
        let orch = CalibrationOrchestrator::new(config(true)).unwrap();
        let items = vec![
            (CalibrationSubject::new("Tool.run"), evidence(&["input"])),
            (CalibrationSubject::new("Ghost.run"), evidence(&[])),
            (CalibrationSubject::new("Tool.run"), evidence(&[])),
        ];
        let results = orch.calibrate_batch(&items);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        let third = results[2].as_ref().unwrap();
        assert_eq!(third.layer_scores[&LayerId::Chain], 0.0);
    }

    #[test]
    fn test_single_chain_evaluator_instance() {
        let orch = CalibrationOrchestrator::new(config(true)).unwrap();
        let registered = orch.evaluators.get(&LayerId::Chain).unwrap();
        let registered = Arc::as_ptr(registered) as *const ();
        let sequence = Arc::as_ptr(&orch.chain) as *const ();
        assert_eq!(registered, sequence);
        assert_eq!(Arc::strong_count(&orch.chain), 2);
    }

    #[test]
    fn test_orchestrator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CalibrationOrchestrator>();
    }
}
