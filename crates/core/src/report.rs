use crate::domain::simulation::{ImpactSummary, SimulationResult};
use crate::engine::ScenarioCatalog;
use chrono::NaiveDateTime;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 60;

/// `+$1.23/barrel (+1.5%)`, or `n/a` for the percentage when it is undefined.
pub fn format_impact(impact: &ImpactSummary) -> String {
    let sign = if impact.difference > 0.0 { "+" } else { "" };
    let pct = match impact.pct_change {
        Some(p) => format!("{sign}{p:.1}%"),
        None => "n/a".to_string(),
    };
    format!("{sign}${:.2}/barrel ({pct})", impact.difference)
}

pub fn render_scenario_list(catalog: &ScenarioCatalog) -> String {
    let mut out = String::new();
    let rule = "=".repeat(50);
    let _ = writeln!(out, "{rule}\nAVAILABLE SCENARIOS\n{rule}");
    for def in catalog.list_all() {
        let _ = writeln!(out, "\n  [{}]", def.key);
        let _ = writeln!(out, "  {}", def.display_name);
        let _ = writeln!(out, "  {}", def.description);
    }
    out
}

/// Full terminal report. Narration sections are left out when absent.
pub fn render_report(
    result: &SimulationResult,
    explanation: Option<&str>,
    uncertainty: Option<&str>,
    generated_at: NaiveDateTime,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "SCENARIO: {}", result.scenario_name);
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "{rule}");

    let _ = write!(out, "\nCURRENT PRICE: ${:.2}/barrel", result.current_price);
    if let Some(d) = result.last_observed {
        let _ = write!(out, " (as of {d})");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "\nSCENARIO DESCRIPTION:\n   {}", result.scenario.description);
    let _ = writeln!(out, "   Magnitude: x{:.2}", result.magnitude_modifier);
    if let Some(confidence) = result.confidence {
        let _ = writeln!(out, "   Match confidence: {confidence}");
    }
    if let Some(reasoning) = result.reasoning.as_deref().filter(|r| !r.is_empty()) {
        let _ = writeln!(out, "   Reasoning: {reasoning}");
    }

    let _ = writeln!(out, "\nSHOCKS APPLIED:");
    let shocks = result.shock_vector.nonzero();
    if shocks.is_empty() {
        let _ = writeln!(out, "   (none)");
    }
    for (driver, value) in shocks {
        let sign = if value > 0.0 { "+" } else { "" };
        let _ = writeln!(out, "   {:<20} {sign}{value}", driver.as_str());
    }

    let _ = writeln!(out, "\nPRICE IMPACT SUMMARY:");
    if let Some(w1) = &result.impact_week1 {
        let _ = writeln!(out, "   Immediate (Week 1):   {}", format_impact(w1));
    }
    if let Some(w12) = &result.impact_week12 {
        let _ = writeln!(out, "   Week 12:              {}", format_impact(w12));
    }
    let _ = writeln!(
        out,
        "   Final (Week {}):{:width$}{}",
        result.horizon_weeks,
        "",
        format_impact(&result.impact_final),
        width = 9usize.saturating_sub(result.horizon_weeks.to_string().len())
    );

    let _ = writeln!(out, "\nWEEK-BY-WEEK FORECAST:");
    let _ = writeln!(
        out,
        "   {:<8} {:>10} {:>10} {:>10}",
        "Week", "Baseline", "Scenario", "Change"
    );
    let _ = writeln!(out, "   {}", "-".repeat(41));
    for (b, s) in result
        .baseline_trajectory
        .points
        .iter()
        .zip(&result.counterfactual_trajectory.points)
    {
        let diff = s.value - b.value;
        let sign = if diff >= 0.0 { "+" } else { "-" };
        let _ = writeln!(
            out,
            "   Week {:<3} {:>10} {:>10} {:>10}",
            b.week,
            format!("${:.2}", b.value),
            format!("${:.2}", s.value),
            format!("{sign}${:.2}", diff.abs())
        );
    }

    if let Some(text) = explanation {
        let _ = writeln!(out, "\nECONOMIC EXPLANATION:\n{text}");
    }
    if let Some(text) = uncertainty {
        let _ = writeln!(out, "\nUNCERTAINTY NOTE:\n{text}");
    }

    let _ = writeln!(out, "\n{rule}");
    out
}
