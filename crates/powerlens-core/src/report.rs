//! Plain-text rendering of an analysis, used by the terminal front end.

use std::fmt::Write;

use crate::{AnalysisIssue, AnalysisResult, HealthBand, SolutionType};

fn band_label(band: HealthBand) -> &'static str {
    match band {
        HealthBand::Good => "good",
        HealthBand::Fair => "fair",
        HealthBand::Poor => "poor",
    }
}

/// Render a full report: score, summary, findings (most severe first) and optimized code.
pub fn render(solution_type: SolutionType, result: &AnalysisResult) -> String {
    let mut out = String::with_capacity(1024 + result.optimized_code.len());

    let _ = writeln!(out, "PowerLens review: {}", solution_type.label());
    let _ = writeln!(
        out,
        "Health score: {}/100 ({})",
        result.score,
        band_label(result.health())
    );
    out.push('\n');
    out.push_str("Summary:\n");
    push_indented(&mut out, &result.summary, 2);
    out.push('\n');

    let (critical, warning, info) = result.count_by_severity();
    let _ = writeln!(
        out,
        "Key findings: {} ({critical} critical, {warning} warning, {info} info)",
        result.issues.len()
    );
    if result.issues.is_empty() {
        out.push_str("  Clean sweep! No major issues found.\n");
    } else {
        let mut issues: Vec<&AnalysisIssue> = result.issues.iter().collect();
        // stable: equal severities keep the model's order
        issues.sort_by(|a, b| b.severity.cmp(&a.severity));
        for (n, issue) in issues.into_iter().enumerate() {
            out.push('\n');
            render_issue(&mut out, n + 1, issue);
        }
    }

    out.push('\n');
    out.push_str("Optimized version:\n");
    if result.optimized_code.trim().is_empty() {
        out.push_str("  (none provided)\n");
    } else {
        push_indented(&mut out, &result.optimized_code, 4);
    }
    out
}

fn render_issue(out: &mut String, n: usize, issue: &AnalysisIssue) {
    let _ = writeln!(
        out,
        "  {n}. [{}] {} ({})",
        issue.severity, issue.title, issue.category
    );
    push_indented(out, &issue.description, 5);
    out.push_str("     Recommendation:\n");
    push_indented(out, &issue.recommendation, 7);
    if let Some(snippet) = &issue.snippet {
        out.push_str("     Impacted area:\n");
        push_indented(out, snippet, 7);
    }
}

fn push_indented(out: &mut String, text: &str, indent: usize) {
    let pad = " ".repeat(indent);
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&pad);
            out.push_str(line);
            out.push('\n');
        }
    }
}
