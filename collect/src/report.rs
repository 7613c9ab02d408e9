//! Report rendering and machine-readable run summaries.
//!
//! One Markdown report per run: header, executive summary, one section per
//! unit in discovery order, recurring-pattern notes, run warnings, and a
//! fixed recommendations block in taxonomy order. Suppressed findings are
//! excluded from every figure by construction — they never reach the
//! [`AnalysisResult`]s this module consumes. The same numbers are available
//! as a serializable [`RunSummary`] in JSON or YAML.

use std::collections::BTreeMap;

use chrono::Utc;
use diag_sweep_core::{AnalysisResult, Category, Diagnostic, Unit};
use serde::{Deserialize, Serialize};

/// Serializable aggregate of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub workspace_root: String,
    pub unit_count: usize,
    pub total_diagnostics: usize,
    pub clean_units: usize,
    pub category_totals: BTreeMap<Category, usize>,
    pub recurring: Vec<String>,
    pub warnings: Vec<String>,
    pub units: Vec<AnalysisResult>,
}

/// Machine output formats for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Json,
    Yaml,
}

/// Aggregates per-unit results into a run summary.
///
/// Unit warnings are surfaced at run level with a unit-name prefix.
pub fn build_summary(
    workspace_root: &str,
    results: Vec<AnalysisResult>,
    recurring: Vec<String>,
) -> RunSummary {
    let mut category_totals: BTreeMap<Category, usize> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut total = 0;
    let mut clean = 0;

    for result in &results {
        total += result.issue_count();
        if result.is_clean() {
            clean += 1;
        }
        for (category, count) in &result.category_counts {
            *category_totals.entry(*category).or_default() += count;
        }
        warnings.extend(
            result
                .warnings
                .iter()
                .map(|warning| format!("{}: {warning}", result.unit_name)),
        );
    }

    RunSummary {
        generated_at: Utc::now().to_rfc3339(),
        workspace_root: workspace_root.to_string(),
        unit_count: results.len(),
        total_diagnostics: total,
        clean_units: clean,
        category_totals,
        recurring,
        warnings,
        units: results,
    }
}

/// Renders the full Markdown report. `units` must be in discovery order and
/// aligned with `summary.units`.
pub fn render_markdown(summary: &RunSummary, units: &[Unit], detailed: bool) -> String {
    let mut out = String::new();

    out.push_str("# Workspace Diagnostics Report\n\n");
    out.push_str(&format!("- **Generated:** {}\n", summary.generated_at));
    out.push_str(&format!("- **Workspace:** {}\n", summary.workspace_root));
    out.push_str(&format!("- **Units analyzed:** {}\n\n", summary.unit_count));

    out.push_str("## Summary\n\n");
    out.push_str(&format!(
        "- **Total diagnostics:** {}\n",
        summary.total_diagnostics
    ));
    out.push_str(&format!(
        "- **Clean units:** {} of {}\n",
        summary.clean_units, summary.unit_count
    ));
    for category in Category::REPORT_ORDER {
        if let Some(count) = summary.category_totals.get(&category) {
            out.push_str(&format!("- **{category}:** {count}\n"));
        }
    }
    out.push('\n');

    for (index, result) in summary.units.iter().enumerate() {
        let path = units
            .get(index)
            .map(|unit| unit.path.display().to_string())
            .unwrap_or_default();
        render_unit_section(&mut out, result, &path, detailed);
    }

    if !summary.recurring.is_empty() {
        out.push_str("## Recurring Patterns\n\n");
        for note in &summary.recurring {
            out.push_str(&format!("- {note}\n"));
        }
        out.push('\n');
    }

    if !summary.warnings.is_empty() {
        out.push_str("## Run Warnings\n\n");
        for warning in &summary.warnings {
            out.push_str(&format!("- {warning}\n"));
        }
        out.push('\n');
    }

    render_recommendations(&mut out, &summary.category_totals);

    out
}

fn render_unit_section(out: &mut String, result: &AnalysisResult, path: &str, detailed: bool) {
    out.push_str(&format!("## Unit: {}\n\n", result.unit_name));
    if !path.is_empty() {
        out.push_str(&format!("- **Path:** `{path}`\n"));
    }
    out.push_str(&format!("- **Issues:** {}\n", result.issue_count()));
    if detailed {
        if let Some(parser) = &result.parser_used {
            out.push_str(&format!("- **Parsed via:** {parser}\n"));
        }
    }

    if result.is_clean() {
        out.push_str("\nNo issues found.\n\n");
        return;
    }

    for (category, count) in &result.category_counts {
        out.push_str(&format!("- **{category}:** {count}\n"));
    }
    out.push('\n');

    for category in Category::REPORT_ORDER {
        let in_category: Vec<&Diagnostic> = result
            .diagnostics
            .iter()
            .filter(|(cat, _)| *cat == category)
            .map(|(_, diag)| diag)
            .collect();
        if in_category.is_empty() {
            continue;
        }

        out.push_str(&format!("### {category}\n\n"));
        for diag in in_category {
            render_diagnostic(out, diag, detailed);
        }
        out.push('\n');
    }
}

fn render_diagnostic(out: &mut String, diag: &Diagnostic, detailed: bool) {
    let mut line = format!("- **{}**: {}", diag.severity, diag.message);
    if let Some(file) = &diag.file_path {
        line.push_str(&format!(" ({file}"));
        if let Some(row) = diag.line {
            line.push_str(&format!(":{row}"));
            if let Some(column) = diag.column {
                line.push_str(&format!(":{column}"));
            }
        }
        line.push(')');
    }
    if let Some(code) = &diag.code {
        line.push_str(&format!(" `[{code}]`"));
    }
    out.push_str(&line);
    out.push('\n');

    if let Some(suggestion) = &diag.suggestion {
        out.push_str(&format!("  - help: {suggestion}\n"));
    }
    if detailed && !diag.raw_context.is_empty() {
        out.push_str("\n  ```\n");
        for context_line in diag.raw_context.lines() {
            out.push_str(&format!("  {context_line}\n"));
        }
        out.push_str("  ```\n");
    }
}

fn render_recommendations(out: &mut String, totals: &BTreeMap<Category, usize>) {
    out.push_str("## Recommendations\n\n");

    let mut any = false;
    for category in Category::REPORT_ORDER {
        if totals.get(&category).copied().unwrap_or_default() == 0 {
            continue;
        }
        any = true;
        let advice = match category {
            Category::Safety => {
                "Eliminate panic and unwrap paths and resolve borrow conflicts first."
            }
            Category::Correctness => "Fix type and resolution errors; they block the build.",
            Category::Performance => "Review the flagged allocation and clone hot spots.",
            Category::Documentation => "Fill in missing documentation for public items.",
            Category::Style => "Align naming and formatting with project conventions.",
            Category::Deprecated => "Migrate off deprecated APIs before they are removed.",
            Category::Suppressed => continue,
        };
        out.push_str(&format!("1. **{category}** — {advice}\n"));
    }
    if !any {
        out.push_str("Nothing to do. Keep it that way.\n");
    }
}

/// Formats the run summary for machine consumption.
pub fn render_summary(summary: &RunSummary, format: SummaryFormat) -> Result<String, String> {
    match format {
        SummaryFormat::Json => serde_json::to_string_pretty(summary)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        SummaryFormat::Yaml => {
            serde_yaml::to_string(summary).map_err(|e| format!("YAML serialization failed: {e}"))
        }
    }
}
