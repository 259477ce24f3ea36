//! Layer requirements resolver: which layers does a method need?
//!
//! Resolution order:
//! 1. Role declared on the calibration subject
//! 2. Role declared in the intrinsic table
//! 3. Role guessed from the method name ([`infer_role_from_name`])
//! 4. Full eight-layer core set
//!
//! A role string in the table that does not parse skips step 3: a broken
//! declaration should surface as a fallback, not be papered over by a guess.

use crate::config::CalibrationConfig;
use crate::models::{CalibrationSubject, LayerId, RoleSource, RoleTag};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Role and layer set chosen for one calibration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleResolution {
    /// None when falling back to the core set
    pub role: Option<RoleTag>,
    pub source: RoleSource,
    pub layers: BTreeSet<LayerId>,
}

impl RoleResolution {
    fn from_role(role: RoleTag, source: RoleSource) -> Self {
        Self {
            role: Some(role),
            source,
            layers: role.layer_set(),
        }
    }

    fn fallback() -> Self {
        Self {
            role: None,
            source: RoleSource::Fallback,
            layers: LayerId::core_set(),
        }
    }

    /// Role name for messages; "UNRESOLVED" for the core fallback
    pub fn role_label(&self) -> String {
        self.role
            .map(|r| r.name().to_string())
            .unwrap_or_else(|| "UNRESOLVED".to_string())
    }
}

pub struct LayerRequirementsResolver {
    config: Arc<CalibrationConfig>,
}

impl LayerRequirementsResolver {
    pub fn new(config: Arc<CalibrationConfig>) -> Self {
        Self { config }
    }

    /// Required layers for a method with no caller-declared role
    pub fn get_required_layers(&self, method_id: &str) -> BTreeSet<LayerId> {
        self.resolve(&CalibrationSubject::new(method_id)).layers
    }

    pub fn resolve(&self, subject: &CalibrationSubject) -> RoleResolution {
        if let Some(role) = subject.role {
            return RoleResolution::from_role(role, RoleSource::Subject);
        }

        let declared = self
            .config
            .intrinsic
            .get(&subject.method_id)
            .and_then(|entry| entry.role.as_deref());

        if let Some(raw) = declared {
            return match raw.parse::<RoleTag>() {
                Ok(role) => {
                    debug!("Role for {} declared as {}", subject.method_id, role);
                    RoleResolution::from_role(role, RoleSource::Declared)
                }
                Err(e) => {
                    warn!(
                        "Unparseable role for {}: {}; using core layer set",
                        subject.method_id, e
                    );
                    RoleResolution::fallback()
                }
            };
        }

        match infer_role_from_name(&subject.method_id) {
            Some(role) => {
                warn!(
                    "No declared role for {}, inferred {} from its name",
                    subject.method_id, role
                );
                RoleResolution::from_role(role, RoleSource::Inferred)
            }
            None => {
                warn!(
                    "No role for {}, using core layer set",
                    subject.method_id
                );
                RoleResolution::fallback()
            }
        }
    }
}

/// Verb prefixes checked against each name token, in priority order
const ROLE_KEYWORDS: &[(RoleTag, &[&str])] = &[
    (RoleTag::IngestPdm, &["ingest", "load", "fetch", "read", "pdm"]),
    (RoleTag::Structure, &["segment", "structur", "split", "section", "chunk"]),
    (RoleTag::Extract, &["extract", "detect", "mine", "find"]),
    (RoleTag::ScoreQ, &["score", "scorer", "evaluat", "assess", "rate", "calculat"]),
    (RoleTag::Aggregate, &["aggregat", "combine", "merge", "fuse", "consolidat"]),
    (RoleTag::Report, &["report", "render", "export", "summar", "format"]),
    (RoleTag::Transform, &["transform", "normaliz", "convert", "clean"]),
    (RoleTag::MetaTool, &["validat", "audit", "log", "config", "cache", "monitor"]),
];

/// Split `ClassName.method_name` into lowercase words
fn name_tokens(method_id: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in method_id.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Guess a role from the method name.
///
/// Only a last resort: the method verb (right-most word) is checked first,
/// then the words before it.
pub fn infer_role_from_name(method_id: &str) -> Option<RoleTag> {
    name_tokens(method_id).iter().rev().find_map(|token| {
        ROLE_KEYWORDS
            .iter()
            .find(|(_, prefixes)| prefixes.iter().any(|p| token.starts_with(p)))
            .map(|(role, _)| *role)
    })
}
