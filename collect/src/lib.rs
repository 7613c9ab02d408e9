//! Diagnostic collection and concurrent workspace analysis.
//!
//! This crate turns raw compiler/lint output into a consolidated diagnostic
//! report for a multi-package Cargo workspace. It handles the whole
//! pipeline: unit discovery, tool invocation under timeouts, tolerant
//! decoding, multi-strategy parsing, heuristic categorization, bounded
//! concurrency, pattern tracking, report rendering, and report archival.
//!
//! # Main entry points
//!
//! - [`run_analysis`] — discover units, run the configured tools against
//!   each under a bounded worker pool, and build the full report.
//! - [`run_import`] — build the same report from an externally exported
//!   problem list instead of invoking any tools.
//! - [`parser::parse_with_fallbacks`] — the ordered parsing cascade over
//!   decoded tool output, usable on its own.
//!
//! # Example
//!
//! ```
//! use diag_sweep_collect::parser::{ParseOptions, parse_with_fallbacks};
//!
//! let text = "\
//! warning: unused import: `std::fmt`
//!  --> src/lib.rs:1:5
//! ";
//!
//! let (found, strategy) = parse_with_fallbacks(text, &ParseOptions::default()).unwrap();
//! assert_eq!(strategy, "free-text");
//! assert_eq!(found[0].file_path.as_deref(), Some("src/lib.rs"));
//! ```

pub mod analyzer;
pub mod archive;
pub mod decode;
pub mod parser;
pub mod pattern;
pub mod report;
pub mod runner;
pub mod schedule;
pub mod workspace;

use std::fs;
use std::path::{Path, PathBuf};

use diag_sweep_core::{AnalysisResult, CategoryPolicy, Unit};
use tracing::info;

use crate::analyzer::{AnalyzerConfig, UnitAnalyzer, finalize_unit};
use crate::pattern::{PatternTracker, RECURRENCE_THRESHOLD};
use crate::report::RunSummary;
use crate::schedule::{CancelFlag, ScheduleConfig};

/// Fatal run failures.
///
/// Everything else in the pipeline — tool failures, decode problems,
/// malformed records, whole units failing analysis — recovers locally and
/// surfaces as warnings. Only these variants abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No analyzable units under the workspace root.
    #[error("no analyzable units found under '{0}'")]
    NoUnits(String),

    /// A `--unit` filter matched nothing.
    #[error("unit filter '{0}' matched no discovered unit")]
    FilterMismatch(String),
}

/// Full configuration of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workspace_root: PathBuf,
    /// Unit-name filters; empty means all discovered units.
    pub unit_filters: Vec<String>,
    pub analyzer: AnalyzerConfig,
    pub schedule: ScheduleConfig,
    pub policy: CategoryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            unit_filters: Vec::new(),
            analyzer: AnalyzerConfig::default(),
            schedule: ScheduleConfig::default(),
            policy: CategoryPolicy::default(),
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Discovered (and filtered) units in discovery order.
    pub units: Vec<Unit>,
    pub summary: RunSummary,
    /// Rendered Markdown report.
    pub report: String,
}

/// Runs the full tool-driven analysis pipeline.
pub fn run_analysis(config: &RunConfig, cancel: &CancelFlag) -> Result<RunOutcome, RunError> {
    let units = workspace::discover_units(&config.workspace_root)?;
    let units = workspace::filter_units(units, &config.unit_filters)?;
    info!(units = units.len(), "starting workspace analysis");

    let tracker = PatternTracker::new();
    let analyzer = UnitAnalyzer::new(
        config.analyzer.clone(),
        &config.policy,
        &tracker,
        &config.workspace_root,
    );

    let results = schedule::run_units(&units, &config.schedule, cancel, |unit| {
        analyzer.analyze(unit)
    });

    Ok(assemble(config, units, results, &tracker))
}

/// Builds the report from an exported problem list, bypassing tool
/// invocation entirely.
pub fn run_import(config: &RunConfig, problems_path: &Path) -> Result<RunOutcome, RunError> {
    let units = workspace::discover_units(&config.workspace_root)?;
    let units = workspace::filter_units(units, &config.unit_filters)?;

    let text = fs::read_to_string(problems_path)?;
    let diagnostics = parser::import::parse_problem_list(&text);
    info!(
        entries = diagnostics.len(),
        path = %problems_path.display(),
        "imported problem list"
    );

    let tracker = PatternTracker::new();
    let mut grouped = parser::import::assign_to_units(diagnostics, &units);
    let results: Vec<AnalysisResult> = units
        .iter()
        .map(|unit| {
            let entries = grouped.remove(&unit.name).unwrap_or_default();
            let parser_used = (!entries.is_empty()).then(|| "problem-import".to_string());
            finalize_unit(
                &unit.name,
                entries,
                Vec::new(),
                parser_used,
                &config.policy,
                &tracker,
            )
        })
        .collect();

    Ok(assemble(config, units, results, &tracker))
}

fn assemble(
    config: &RunConfig,
    units: Vec<Unit>,
    results: Vec<AnalysisResult>,
    tracker: &PatternTracker,
) -> RunOutcome {
    let recurring = tracker.recurring_notes(RECURRENCE_THRESHOLD);
    let summary = report::build_summary(
        &config.workspace_root.display().to_string(),
        results,
        recurring,
    );
    let rendered = report::render_markdown(&summary, &units, config.analyzer.detailed);
    RunOutcome {
        units,
        summary,
        report: rendered,
    }
}
