//! Per-unit analysis orchestration.
//!
//! One analyzer instance drives the whole tool chain for a unit: run each
//! configured tool, decode its output, apply the parser cascade, and keep
//! the first non-empty yield per tool. Units that fail to build in
//! isolation get a workspace-wide fallback invocation filtered back down by
//! path prefix, then a last attempt at the unit's own stderr. Producing no
//! diagnostics at all is a normal outcome, not an error.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use diag_sweep_core::{AnalysisResult, Category, CategoryPolicy, Diagnostic, Unit};
use tracing::{debug, info};

use crate::decode::decode_tool_output;
use crate::parser::{FreeTextStrategy, ParseOptions, ParseStrategy, parse_with_fallbacks};
use crate::pattern::PatternTracker;
use crate::runner::{DEFAULT_TOOL_TIMEOUT, run_tool};

/// One external tool to run against a unit.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Short label used in warnings ("clippy", "check").
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
}

impl ToolSpec {
    pub fn new(label: &str, program: &str, args: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
        }
    }
}

/// Per-run analyzer configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub skip_lint: bool,
    pub timeout: Duration,
    pub detailed: bool,
    /// Permits the workspace-wide fallback invocation for units that fail
    /// in isolation.
    pub workspace_fallback: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            skip_lint: false,
            timeout: DEFAULT_TOOL_TIMEOUT,
            detailed: false,
            workspace_fallback: true,
        }
    }
}

/// The tool chain for one unit, in execution order.
pub fn tool_chain(skip_lint: bool) -> Vec<ToolSpec> {
    let mut tools = Vec::new();
    if !skip_lint {
        tools.push(ToolSpec::new(
            "clippy",
            "cargo",
            &["clippy", "--message-format=json", "--quiet"],
        ));
    }
    tools.push(ToolSpec::new(
        "check",
        "cargo",
        &["check", "--message-format=json", "--quiet"],
    ));
    tools
}

pub struct UnitAnalyzer<'a> {
    config: AnalyzerConfig,
    tools: Vec<ToolSpec>,
    policy: &'a CategoryPolicy,
    tracker: &'a PatternTracker,
    workspace_root: &'a Path,
}

impl<'a> UnitAnalyzer<'a> {
    pub fn new(
        config: AnalyzerConfig,
        policy: &'a CategoryPolicy,
        tracker: &'a PatternTracker,
        workspace_root: &'a Path,
    ) -> Self {
        let tools = tool_chain(config.skip_lint);
        Self {
            config,
            tools,
            policy,
            tracker,
            workspace_root,
        }
    }

    /// Overrides the tool chain. Used by tests and embedders with their own
    /// tool set.
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Analyzes one unit end to end.
    pub fn analyze(&self, unit: &Unit) -> AnalysisResult {
        let options = ParseOptions {
            detailed: self.config.detailed,
        };
        let mut collected: Vec<Diagnostic> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut parser_used: Option<String> = None;
        let mut any_tool_failed = false;
        let mut unit_stderr = String::new();

        for tool in &self.tools {
            let args: Vec<&str> = tool.args.iter().map(String::as_str).collect();
            let output = match run_tool(&tool.program, &args, &unit.path, self.config.timeout) {
                Ok(output) => output,
                Err(err) => {
                    warnings.push(format!("{}: {err}", tool.label));
                    any_tool_failed = true;
                    continue;
                }
            };

            if output.timed_out {
                warnings.push(format!(
                    "{} timed out after {}s",
                    tool.label,
                    self.config.timeout.as_secs()
                ));
            }

            let stdout_text = decode_tool_output(&output.stdout);
            let mut parsed = parse_with_fallbacks(&stdout_text, &options);

            if parsed.is_none() {
                // Tools route human-readable diagnostics to stderr; give it
                // one pass with the free-text parser before giving up.
                let stderr_text = decode_tool_output(&output.stderr);
                let from_stderr = FreeTextStrategy.parse(&stderr_text, &options);
                unit_stderr = stderr_text;
                if !from_stderr.is_empty() {
                    parsed = Some((from_stderr, FreeTextStrategy.name()));
                }
            }

            match parsed {
                Some((found, strategy)) => {
                    debug!(
                        unit = %unit.name,
                        tool = %tool.label,
                        strategy,
                        count = found.len(),
                        "tool produced diagnostics"
                    );
                    if parser_used.is_none() {
                        parser_used = Some(strategy.to_string());
                    }
                    collected.extend(found);
                }
                None if !output.succeeded() => {
                    any_tool_failed = true;
                }
                None => {}
            }
        }

        if collected.is_empty() && any_tool_failed && self.config.workspace_fallback {
            let (fallback, strategy) = self.workspace_wide_fallback(unit, &options, &mut warnings);
            collected = fallback;
            if collected.is_empty() && !unit_stderr.is_empty() {
                collected = FreeTextStrategy.parse(&unit_stderr, &options);
                if !collected.is_empty() {
                    parser_used = Some(FreeTextStrategy.name().to_string());
                }
            } else if let Some(strategy) = strategy {
                parser_used = Some(strategy.to_string());
            }
        }

        let result = finalize_unit(
            &unit.name,
            collected,
            warnings,
            parser_used,
            self.policy,
            self.tracker,
        );
        info!(
            unit = %unit.name,
            issues = result.issue_count(),
            warnings = result.warnings.len(),
            "unit analyzed"
        );
        result
    }

    /// Runs one workspace-wide check and keeps only diagnostics whose file
    /// path falls under the unit's directory.
    fn workspace_wide_fallback(
        &self,
        unit: &Unit,
        options: &ParseOptions,
        warnings: &mut Vec<String>,
    ) -> (Vec<Diagnostic>, Option<&'static str>) {
        warnings.push(format!(
            "unit build failed, falling back to workspace-wide analysis for '{}'",
            unit.name
        ));

        let output = match run_tool(
            "cargo",
            &["check", "--message-format=json", "--quiet"],
            self.workspace_root,
            self.config.timeout,
        ) {
            Ok(output) => output,
            Err(err) => {
                warnings.push(format!("workspace fallback: {err}"));
                return (Vec::new(), None);
            }
        };

        let text = decode_tool_output(&output.stdout);
        let Some((found, strategy)) = parse_with_fallbacks(&text, options) else {
            return (Vec::new(), None);
        };

        let prefix = unit
            .path
            .strip_prefix(self.workspace_root)
            .unwrap_or(&unit.path)
            .to_string_lossy()
            .into_owned();
        let filtered = found
            .into_iter()
            .filter(|diag| {
                diag.file_path
                    .as_deref()
                    .is_some_and(|path| path.starts_with(&format!("{prefix}/")))
            })
            .collect();
        (filtered, Some(strategy))
    }
}

/// Deduplicates, tracks, categorizes, and counts a unit's raw diagnostics.
///
/// Shared by the analyzer and the import path. Deduplication is exact
/// message equality, first occurrence wins. Every surviving raw diagnostic
/// is observed by the pattern tracker before suppression filtering, so
/// suppressed-but-frequent patterns stay visible in the tracker while never
/// reaching the counts or the report body.
pub fn finalize_unit(
    unit_name: &str,
    diagnostics: Vec<Diagnostic>,
    warnings: Vec<String>,
    parser_used: Option<String>,
    policy: &CategoryPolicy,
    tracker: &PatternTracker,
) -> AnalysisResult {
    let mut result = AnalysisResult::empty(unit_name);
    result.warnings = warnings;
    result.parser_used = parser_used;

    let mut seen: HashSet<String> = HashSet::new();
    for diagnostic in diagnostics {
        if !seen.insert(diagnostic.message.clone()) {
            continue;
        }

        tracker.observe(&diagnostic);

        let category = policy.categorize(&diagnostic);
        if category == Category::Suppressed {
            continue;
        }
        *result.category_counts.entry(category).or_default() += 1;
        result.diagnostics.push((category, diagnostic));
    }

    result
}

#[cfg(test)]
mod tests {
    use diag_sweep_core::Severity;

    use super::*;

    fn fixture_policy() -> CategoryPolicy {
        CategoryPolicy::default()
    }

    #[test]
    fn test_tool_chain_runs_lint_then_check() {
        let tools = tool_chain(false);
        let labels: Vec<&str> = tools.iter().map(|tool| tool.label.as_str()).collect();
        assert_eq!(labels, vec!["clippy", "check"]);
    }

    #[test]
    fn test_tool_chain_skip_lint_drops_clippy() {
        let tools = tool_chain(true);
        let labels: Vec<&str> = tools.iter().map(|tool| tool.label.as_str()).collect();
        assert_eq!(labels, vec!["check"]);
    }

    #[test]
    fn test_finalize_dedupes_identical_messages() {
        let policy = fixture_policy();
        let tracker = PatternTracker::new();
        let diagnostics = vec![
            Diagnostic::new("unused import: `std::fmt`", Severity::Warning),
            Diagnostic::new("unused import: `std::fmt`", Severity::Warning),
            Diagnostic::new("mismatched types", Severity::Error),
        ];

        let result = finalize_unit("demo", diagnostics, Vec::new(), None, &policy, &tracker);
        assert_eq!(result.issue_count(), 2);
    }

    #[test]
    fn test_finalize_drops_suppressed_from_counts_and_list() {
        let policy = fixture_policy();
        let tracker = PatternTracker::new();
        let diagnostics = vec![
            Diagnostic::new("passed by value", Severity::Warning)
                .with_code("needless_pass_by_value"),
            Diagnostic::new("mismatched types", Severity::Error).with_code("E0308"),
        ];

        let result = finalize_unit("demo", diagnostics, Vec::new(), None, &policy, &tracker);
        assert_eq!(result.issue_count(), 1);
        assert!(!result.category_counts.contains_key(&Category::Suppressed));
        assert_eq!(result.category_counts[&Category::Correctness], 1);
        assert!(diag_sweep_core::validate_result(&result).is_empty());
    }

    #[test]
    fn test_finalize_tracks_suppressed_diagnostics_anyway() {
        let policy = fixture_policy();
        let tracker = PatternTracker::new();
        let diagnostics: Vec<Diagnostic> = (0..3)
            .map(|index| {
                Diagnostic::new(
                    format!("argument {index} is passed by value"),
                    Severity::Warning,
                )
                .with_code("needless_pass_by_value")
            })
            .collect();

        let result = finalize_unit("demo", diagnostics, Vec::new(), None, &policy, &tracker);
        assert!(result.is_clean());
        // The tracker still saw the suppressed lint three times.
        let notes = tracker.recurring_notes(3);
        assert!(notes.iter().any(|note| note.contains("needless_pass_by_value")));
    }

    #[test]
    fn test_timed_out_unit_yields_zero_diagnostics_and_a_warning() {
        let policy = fixture_policy();
        let tracker = PatternTracker::new();
        let root = tempfile::tempdir().unwrap();
        let config = AnalyzerConfig {
            timeout: Duration::from_millis(200),
            workspace_fallback: false,
            ..AnalyzerConfig::default()
        };

        let analyzer = UnitAnalyzer::new(config, &policy, &tracker, root.path()).with_tools(vec![
            ToolSpec::new("slow-tool", "sh", &["-c", "sleep 30"]),
        ]);
        let unit = Unit::new("stuck", root.path());

        let result = analyzer.analyze(&unit);
        assert!(result.is_clean());
        assert!(result.warnings.iter().any(|warning| warning.contains("timed out")));
    }

    #[test]
    fn test_analyzer_parses_structured_tool_output() {
        let policy = fixture_policy();
        let tracker = PatternTracker::new();
        let root = tempfile::tempdir().unwrap();
        let config = AnalyzerConfig {
            workspace_fallback: false,
            ..AnalyzerConfig::default()
        };

        let record = r#"{"reason":"compiler-message","message":{"message":"unused variable: `x`","level":"warning","spans":[]}}"#;
        let command = format!("echo '{record}'");
        let analyzer = UnitAnalyzer::new(config, &policy, &tracker, root.path())
            .with_tools(vec![ToolSpec::new("fake", "sh", &["-c", &command])]);

        let result = analyzer.analyze(&Unit::new("demo", root.path()));
        assert_eq!(result.issue_count(), 1);
        assert_eq!(result.parser_used.as_deref(), Some("structured-records"));
    }
}
