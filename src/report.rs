//! Plain and colored rendering of probe outcomes
//!
//! Presentation only: probe results stay distinct as data, and this module
//! decides how each one reads on screen.

use crate::{
    models::{ProbeResult, ProbeRound},
    types::{PerformanceLevel, ProbeOutcome},
};
use colored::*;
use std::fmt::Write as _;

/// Short label for an outcome: `"<ms> ms"`, `"Network Error"` or `"No Response"`
pub fn outcome_label(outcome: &ProbeOutcome) -> String {
    match outcome {
        ProbeOutcome::Success(elapsed) => format!("{} ms", elapsed.as_millis()),
        ProbeOutcome::NetworkError(_) => "Network Error".to_string(),
        ProbeOutcome::Timeout => "No Response".to_string(),
    }
}

/// Terminal color for a performance level
pub fn level_color(level: PerformanceLevel) -> Color {
    match level {
        PerformanceLevel::Excellent => Color::Green,
        PerformanceLevel::Good => Color::Cyan,
        PerformanceLevel::Fair => Color::Yellow,
        PerformanceLevel::Poor => Color::Magenta,
    }
}

/// Outcome label, colored by latency when `use_color` is set
pub fn colored_outcome_label(outcome: &ProbeOutcome, use_color: bool) -> String {
    paint(outcome_label(outcome), outcome, use_color)
}

fn paint(text: String, outcome: &ProbeOutcome, use_color: bool) -> String {
    if !use_color {
        return text;
    }

    match outcome {
        ProbeOutcome::Success(elapsed) => {
            text.color(level_color(PerformanceLevel::from_duration(*elapsed))).to_string()
        }
        ProbeOutcome::NetworkError(_) => text.red().to_string(),
        ProbeOutcome::Timeout => text.bright_black().to_string(),
    }
}

/// One table row: endpoint name, host and outcome label
pub fn format_result_row(result: &ProbeResult, use_color: bool) -> String {
    let host = result.endpoint.host().unwrap_or_default();
    // Pad before coloring so escape codes do not break alignment
    let label = paint(format!("{:>14}", outcome_label(&result.outcome)), &result.outcome, use_color);

    format!("{:<3} {:<12} {:<36} {}", result.endpoint.id, result.endpoint.name, host, label)
}

/// Render a round as a table ordered by endpoint id, with a summary line
pub fn render_round(round: &ProbeRound, use_color: bool) -> String {
    let mut output = String::new();

    let header = format!("{:<3} {:<12} {:<36} {:>14}", "ID", "Endpoint", "Host", "Latency");
    if use_color {
        let _ = writeln!(output, "{}", header.bold());
    } else {
        let _ = writeln!(output, "{}", header);
    }
    let _ = writeln!(output, "{}", "-".repeat(header.len()));

    let mut results: Vec<&ProbeResult> = round.results.iter().collect();
    results.sort_by_key(|r| r.endpoint.id);
    for result in results {
        let _ = writeln!(output, "{}", format_result_row(result, use_color));
    }

    let _ = writeln!(output);
    let summary = match round.fastest() {
        Some(fastest) => format!(
            "{}/{} reachable, fastest: {} ({})",
            round.successes().count(),
            round.expected,
            fastest.endpoint.name,
            outcome_label(&fastest.outcome)
        ),
        None => format!("0/{} reachable", round.expected),
    };
    let _ = write!(output, "{}", summary);
    if round.is_cancelled() {
        let _ = write!(output, " (cancelled)");
    }

    output
}
