//! Diagnostic type definitions for workspace analysis.
//!
//! This module defines the core data model shared by every parser and
//! consumer in the pipeline. The types are designed for serialization with
//! [`serde`] and round-trip through JSON report summaries and imported
//! problem lists.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity level of a single diagnostic.
///
/// Mirrors the level labels emitted by compiler and lint tools. Unknown
/// labels degrade to [`Severity::Warning`] rather than being dropped, so a
/// tool inventing a new level never loses findings.
///
/// # Examples
///
/// ```
/// use diag_sweep_core::Severity;
///
/// assert_eq!(Severity::from_label("error"), Severity::Error);
/// assert_eq!(Severity::from_label("HELP"), Severity::Help);
/// assert_eq!(Severity::from_label("fancy-new-level"), Severity::Warning);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Note,
    Help,
    Info,
    Hint,
}

impl Severity {
    /// Maps a tool-emitted level label to a severity.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "error" | "failure-note" => Self::Error,
            "warning" => Self::Warning,
            "note" => Self::Note,
            "help" => Self::Help,
            "info" | "information" => Self::Info,
            "hint" => Self::Hint,
            _ => Self::Warning,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Note => write!(f, "note"),
            Self::Help => write!(f, "help"),
            Self::Info => write!(f, "info"),
            Self::Hint => write!(f, "hint"),
        }
    }
}

/// One normalized finding extracted from tool output.
///
/// Every parser in the pipeline produces this shape regardless of source
/// format. The message is never empty: parsers filter empty-message records
/// at the source. Category is derived by the categorizer at analysis time
/// and is not stored on the struct.
///
/// # Examples
///
/// ```
/// use diag_sweep_core::{Diagnostic, Severity};
///
/// let diag = Diagnostic::new("unused variable: `x`", Severity::Warning)
///     .with_code("unused_variables")
///     .with_location("src/lib.rs", Some(3), Some(5));
/// assert_eq!(diag.code.as_deref(), Some("unused_variables"));
/// assert_eq!(diag.line, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Primary message text. Never empty.
    pub message: String,
    pub severity: Severity,
    /// Tool-specific identifier (e.g. `E0308` or a lint name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// Actionable help text when the tool offered one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Original text block the diagnostic was extracted from. Retained for
    /// detailed reporting; empty when the source had no surrounding block.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_context: String,
}

impl Diagnostic {
    /// Creates a diagnostic with just a message and severity.
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            code: None,
            file_path: None,
            line: None,
            column: None,
            suggestion: None,
            raw_context: String::new(),
        }
    }

    /// Sets the tool-specific code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the source location.
    pub fn with_location(
        mut self,
        file: impl Into<String>,
        line: Option<u32>,
        column: Option<u32>,
    ) -> Self {
        self.file_path = Some(file.into());
        self.line = line;
        self.column = column;
        self
    }

    /// Sets the suggestion text.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Sets the retained raw context block.
    pub fn with_raw_context(mut self, raw: impl Into<String>) -> Self {
        self.raw_context = raw.into();
        self
    }
}

/// One independently analyzable workspace member.
///
/// Units are discovered once at run start by walking manifest files and are
/// immutable for the rest of the run. Names are unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub path: PathBuf,
}

impl Unit {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Taxonomy bucket assigned to a diagnostic.
///
/// `Suppressed` marks findings matching the suppression list (intentional,
/// architecture-protected design choices). Suppressed diagnostics are
/// computed but excluded from every downstream count, list, and report
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Safety,
    Correctness,
    Performance,
    Documentation,
    Style,
    Deprecated,
    Suppressed,
}

impl Category {
    /// Reporting order for category sections and recommendations.
    /// `Suppressed` is intentionally absent.
    pub const REPORT_ORDER: [Category; 6] = [
        Category::Safety,
        Category::Correctness,
        Category::Performance,
        Category::Documentation,
        Category::Style,
        Category::Deprecated,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safety => write!(f, "Safety"),
            Self::Correctness => write!(f, "Correctness"),
            Self::Performance => write!(f, "Performance"),
            Self::Documentation => write!(f, "Documentation"),
            Self::Style => write!(f, "Style"),
            Self::Deprecated => write!(f, "Deprecated"),
            Self::Suppressed => write!(f, "Suppressed"),
        }
    }
}

/// Outcome of analyzing one unit.
///
/// Diagnostics keep their discovery order within the unit. Category counts
/// never include `Suppressed`. Each result is produced by exactly one
/// worker and read only after all workers join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub unit_name: String,
    /// Categorized diagnostics in discovery order, suppressed ones removed.
    pub diagnostics: Vec<(Category, Diagnostic)>,
    pub category_counts: BTreeMap<Category, usize>,
    /// Non-fatal unit-level annotations (timeouts, fallback notes).
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Name of the parsing strategy that produced the diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser_used: Option<String>,
}

impl AnalysisResult {
    /// Creates an empty result for a unit ("no issues found").
    pub fn empty(unit_name: impl Into<String>) -> Self {
        Self {
            unit_name: unit_name.into(),
            diagnostics: Vec::new(),
            category_counts: BTreeMap::new(),
            warnings: Vec::new(),
            parser_used: None,
        }
    }

    /// Total diagnostic count (suppressed findings are already excluded).
    pub fn issue_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// True when the unit produced no reportable diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_label_known_levels() {
        assert_eq!(Severity::from_label("error"), Severity::Error);
        assert_eq!(Severity::from_label("warning"), Severity::Warning);
        assert_eq!(Severity::from_label("note"), Severity::Note);
        assert_eq!(Severity::from_label("help"), Severity::Help);
        assert_eq!(Severity::from_label("info"), Severity::Info);
        assert_eq!(Severity::from_label("hint"), Severity::Hint);
    }

    #[test]
    fn test_severity_from_label_unknown_degrades_to_warning() {
        assert_eq!(Severity::from_label(""), Severity::Warning);
        assert_eq!(Severity::from_label("critical"), Severity::Warning);
    }

    #[test]
    fn test_severity_serde_snake_case() {
        let json = serde_json::to_string(&Severity::Error).unwrap();
        assert_eq!(json, "\"error\"");
        let back: Severity = serde_json::from_str("\"hint\"").unwrap();
        assert_eq!(back, Severity::Hint);
    }

    #[test]
    fn test_diagnostic_builder_chain() {
        let diag = Diagnostic::new("mismatched types", Severity::Error)
            .with_code("E0308")
            .with_location("src/main.rs", Some(10), Some(5))
            .with_suggestion("consider using `.into()`");

        assert_eq!(diag.message, "mismatched types");
        assert_eq!(diag.code.as_deref(), Some("E0308"));
        assert_eq!(diag.file_path.as_deref(), Some("src/main.rs"));
        assert_eq!(diag.line, Some(10));
        assert_eq!(diag.column, Some(5));
        assert!(diag.suggestion.is_some());
    }

    #[test]
    fn test_diagnostic_serde_omits_empty_optionals() {
        let diag = Diagnostic::new("unused import", Severity::Warning);
        let json = serde_json::to_string(&diag).unwrap();
        assert!(!json.contains("code"));
        assert!(!json.contains("file_path"));
        assert!(!json.contains("raw_context"));
    }

    #[test]
    fn test_category_report_order_excludes_suppressed() {
        assert!(!Category::REPORT_ORDER.contains(&Category::Suppressed));
        assert_eq!(Category::REPORT_ORDER[0], Category::Safety);
        assert_eq!(Category::REPORT_ORDER[5], Category::Deprecated);
    }

    #[test]
    fn test_analysis_result_empty_is_clean() {
        let result = AnalysisResult::empty("core");
        assert!(result.is_clean());
        assert_eq!(result.issue_count(), 0);
        assert_eq!(result.unit_name, "core");
    }
}
