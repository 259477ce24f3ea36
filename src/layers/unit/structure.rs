//! S: structural compliance of the source document
//!
//! ```text
//! S = 0.5·BlockCoverage + 0.25·HeaderValidity + 0.25·SequenceOrdering
//! ```

use crate::config::UnitLayerParams;
use crate::models::{PdtStructure, StructuralBreakdown};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

const BLOCK_COVERAGE_WEIGHT: f64 = 0.5;
const HEADER_VALIDITY_WEIGHT: f64 = 0.25;
const SEQUENCE_ORDERING_WEIGHT: f64 = 0.25;

fn header_numbering() -> &'static Regex {
    static HEADER_NUMBERING: OnceLock<Regex> = OnceLock::new();
    // "1.", "1.2", "2.3.1", "IV.", "Capítulo 3"
    HEADER_NUMBERING.get_or_init(|| {
        Regex::new(r"^\s*(?:\d{1,2}(?:\.\d+)*\.?\s|\d{1,2}(?:\.\d+)+|[IVXLCDM]+\.\s|(?i:cap[ií]tulo)\s+[0-9IVXLCDM]+)")
            .expect("valid regex")
    })
}

/// Whether a header starts with a recognized numbering prefix
pub fn has_valid_numbering(header: &str) -> bool {
    header_numbering().is_match(header)
}

pub(super) fn structural_score(
    pdt: &PdtStructure,
    params: &UnitLayerParams,
) -> (f64, StructuralBreakdown) {
    let breakdown = StructuralBreakdown {
        block_coverage: block_coverage(&pdt.blocks_found, &params.required_blocks),
        header_validity: header_validity(&pdt.headers),
        sequence_ordering: sequence_ordering(&pdt.blocks_found, &params.required_blocks),
    };
    let s = BLOCK_COVERAGE_WEIGHT * breakdown.block_coverage
        + HEADER_VALIDITY_WEIGHT * breakdown.header_validity
        + SEQUENCE_ORDERING_WEIGHT * breakdown.sequence_ordering;
    (s, breakdown)
}

fn block_coverage(found: &[String], required: &[String]) -> f64 {
    if required.is_empty() {
        return 1.0;
    }
    let found: BTreeSet<&String> = found.iter().collect();
    let covered = required.iter().filter(|b| found.contains(b)).count();
    covered as f64 / required.len() as f64
}

fn header_validity(headers: &[String]) -> f64 {
    if headers.is_empty() {
        return 0.0;
    }
    let valid = headers.iter().filter(|h| has_valid_numbering(h)).count();
    valid as f64 / headers.len() as f64
}

/// Positional match of found canonical blocks against the canonical order.
/// Non-canonical blocks are ignored and repeats keep their first position.
fn sequence_ordering(found: &[String], canonical: &[String]) -> f64 {
    if canonical.is_empty() {
        return 1.0;
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut filtered: Vec<&String> = Vec::new();
    for block in found {
        if canonical.contains(block) && seen.insert(block.as_str()) {
            filtered.push(block);
        }
    }
    let matched = canonical
        .iter()
        .zip(filtered.iter())
        .filter(|(expected, actual)| expected.as_str() == actual.as_str())
        .count();
    matched as f64 / canonical.len() as f64
}
