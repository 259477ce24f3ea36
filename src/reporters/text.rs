//! Text (terminal) reporter with colors and formatting

use crate::models::{
    CalibrationResult, ChainSequenceReport, LayerDetail, QualityBand, ScoreProvenance,
};

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

fn band_color(band: QualityBand) -> &'static str {
    match band {
        QualityBand::Excellent => "\x1b[32m",    // Green
        QualityBand::Good => "\x1b[92m",         // Light green
        QualityBand::Acceptable => "\x1b[33m",   // Yellow
        QualityBand::Insufficient => "\x1b[31m", // Red
    }
}

/// Color a single score by the band it would fall in
fn format_score(score: f64) -> String {
    let color = band_color(QualityBand::from_score(score));
    format!("{color}{:.3}{RESET}", score)
}

/// Fixed-width bar, 20 cells
fn score_bar(score: f64) -> String {
    let filled = (score.clamp(0.0, 1.0) * 20.0).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled))
}

fn provenance_label(provenance: ScoreProvenance) -> &'static str {
    match provenance {
        ScoreProvenance::Table => "table",
        ScoreProvenance::RoleDefault => "role default",
        ScoreProvenance::Fallback => "fallback",
        ScoreProvenance::UnmappedPenalty => "unmapped",
        ScoreProvenance::Precomputed => "precomputed",
    }
}

fn detail_note(detail: Option<&LayerDetail>) -> String {
    match detail {
        Some(LayerDetail::Lookup { provenance }) => provenance_label(*provenance).to_string(),
        Some(LayerDetail::Chain(chain)) => {
            let mut parts = Vec::new();
            if !chain.signature_known {
                parts.push("no signature".to_string());
            }
            if !chain.missing_required.is_empty() {
                parts.push(format!("missing {}", chain.missing_required.join(", ")));
            }
            if !chain.missing_critical.is_empty() {
                parts.push(format!("critical {}", chain.missing_critical.join(", ")));
            }
            if !chain.schema_violations.is_empty() {
                parts.push(format!("{} type issue(s)", chain.schema_violations.len()));
            }
            parts.join("; ")
        }
        Some(LayerDetail::Unit(unit)) => format!(
            "S {:.2} M {:.2} I {:.2}{} P {:.2}{} -{:.2}",
            unit.s,
            unit.m,
            unit.i,
            if unit.i_gate_passed { "" } else { "✗" },
            unit.p,
            if unit.p_gate_passed { "" } else { "✗" },
            unit.penalty
        ),
        None => String::new(),
    }
}

/// Render a calibration result as formatted terminal output
pub fn render_calibration(result: &CalibrationResult) -> String {
    let mut out = String::new();
    let band = result.metadata.quality_band;
    let band_c = band_color(band);
    let role = result
        .role
        .map(|r| r.name().to_string())
        .unwrap_or_else(|| "UNRESOLVED".to_string());

    out.push_str(&format!("\n{BOLD}Calibration: {}{RESET}\n", result.method_id));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Score: {BOLD}{:.4}{RESET}  Band: {band_c}{BOLD}{}{RESET}  Role: {} {DIM}({:?}){RESET}\n\n",
        result.final_score, band, role, result.metadata.role_source
    ));

    out.push_str(&format!("{BOLD}LAYERS{RESET}\n"));
    for (layer, score) in &result.layer_scores {
        let note = detail_note(result.metadata.layer_details.get(layer));
        out.push_str(&format!(
            "  {:<7} {} {}  {DIM}{}{RESET}\n",
            layer.symbol(),
            score_bar(*score),
            format_score(*score),
            note
        ));
    }
    out.push('\n');

    let fusion = &result.metadata.fusion;
    out.push_str(&format!(
        "{BOLD}FUSION{RESET}  linear {:.4} + interaction {:.4}\n",
        fusion.linear_sum, fusion.interaction_sum
    ));
    for term in &fusion.interactions {
        out.push_str(&format!(
            "  {DIM}{} × {}: {:.2} · {:.3} = {:.4}{RESET}\n",
            term.layers.0.symbol(),
            term.layers.1.symbol(),
            term.weight,
            term.min_score,
            term.contribution
        ));
    }

    if !result.metadata.warnings.is_empty() {
        out.push_str(&format!(
            "\n{BOLD}WARNINGS{RESET} ({})\n",
            result.metadata.warnings.len()
        ));
        for warning in &result.metadata.warnings {
            out.push_str(&format!("  \x1b[33m!{RESET} {}\n", warning));
        }
    }

    let fingerprint: String = result.metadata.config_fingerprint.chars().take(12).collect();
    out.push_str(&format!("\n{DIM}config {}{RESET}\n", fingerprint));
    out
}

/// Render a chain sequence report as formatted terminal output
pub fn render_chain(report: &ChainSequenceReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{BOLD}Chain Validation{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Quality: {BOLD}{}{RESET}  Weakest link: {}\n\n",
        format_score(report.chain_quality),
        report.weakest_link.as_deref().unwrap_or("-")
    ));

    if report.method_scores.is_empty() {
        out.push_str(&format!("{DIM}  (empty chain){RESET}\n"));
        return out;
    }

    out.push_str(&format!("{DIM}  #   SCORE  METHOD{RESET}\n"));
    for (i, step) in report.method_scores.iter().enumerate() {
        let marker = if report.weakest_link.as_deref() == Some(step.method_id.as_str())
            && step.score == report.chain_quality
        {
            " ◄"
        } else {
            ""
        };
        out.push_str(&format!(
            "  {DIM}{:>3}{RESET}  {}  {}{}\n",
            i + 1,
            format_score(step.score),
            step.method_id,
            marker
        ));
        let note = detail_note(Some(&LayerDetail::Chain(step.validation.clone())));
        if !note.is_empty() {
            out.push_str(&format!("            {DIM}{}{RESET}\n", note));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::{test_chain_report, test_result};

    #[test]
    fn test_render_calibration() {
        let out = render_calibration(&test_result());
        assert!(out.contains("Reporter.render"));
        assert!(out.contains("REPORT"));
        assert!(out.contains("@chain"));
        assert!(out.contains("critical metadata"));
        assert!(out.contains("WARNINGS"));
        assert!(out.contains("abababababab"));
    }

    #[test]
    fn test_render_chain_marks_weakest() {
        let out = render_chain(&test_chain_report());
        assert!(out.contains("Weakest link: Parse.doc"));
        assert!(out.contains("Parse.doc ◄"));
        assert!(out.contains("missing doc"));
    }

    #[test]
    fn test_render_empty_chain() {
        let out = render_chain(&ChainSequenceReport::default());
        assert!(out.contains("(empty chain)"));
    }

    #[test]
    fn test_score_bar_bounds() {
        assert_eq!(score_bar(1.0).chars().count(), 20);
        assert_eq!(score_bar(-3.0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(score_bar(0.5).chars().filter(|c| *c == '█').count(), 10);
    }
}
