//! M: mandatory section completeness

use crate::config::{SectionRequirement, UnitLayerParams};
use crate::models::{PdtStructure, SectionStats};

const CRITICAL_SECTION_WEIGHT: f64 = 2.0;
const STANDARD_SECTION_WEIGHT: f64 = 1.0;

fn capped_ratio(actual: usize, minimum: usize) -> f64 {
    if minimum == 0 {
        return 1.0;
    }
    (actual as f64 / minimum as f64).min(1.0)
}

/// `0.4·tokens + 0.2·keywords + 0.2·numbers + 0.2·sources`
pub(super) fn section_score(stats: &SectionStats, requirement: &SectionRequirement) -> f64 {
    0.4 * capped_ratio(stats.token_count, requirement.min_tokens)
        + 0.2 * capped_ratio(stats.keyword_matches, requirement.min_keywords)
        + 0.2 * capped_ratio(stats.numeric_count, requirement.min_numbers)
        + 0.2 * capped_ratio(stats.source_citations, requirement.min_sources)
}

pub(super) fn mandatory_sections_score(pdt: &PdtStructure, params: &UnitLayerParams) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (id, requirement) in &params.sections {
        let weight = if requirement.critical {
            CRITICAL_SECTION_WEIGHT
        } else {
            STANDARD_SECTION_WEIGHT
        };
        let score = pdt
            .sections
            .get(id)
            .map_or(0.0, |stats| section_score(stats, requirement));
        weighted += weight * score;
        total_weight += weight;
    }
    if total_weight == 0.0 {
        return 1.0;
    }
    weighted / total_weight
}
