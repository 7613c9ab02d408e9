//! Heuristic categorization of diagnostics into the fixed taxonomy.
//!
//! Classification is a pure function of a diagnostic's code and message,
//! driven by a [`CategoryPolicy`]: an ordered set of code tables and keyword
//! lists with compiled-in defaults. The whole policy deserializes from JSON
//! so a project can replace the judgment calls (notably the suppression
//! list) without rebuilding.
//!
//! The suppression check runs first and is terminal: a finding matching the
//! suppression list is `Suppressed` even if it would otherwise match a
//! Safety or Correctness rule, which guarantees protected findings never
//! reach counts or report sections.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Category, Diagnostic};

/// Compiler error codes for unsound memory/aliasing issues (borrow checker
/// and lifetime violations).
fn default_safety_codes() -> Vec<String> {
    to_strings(&[
        "E0382", "E0499", "E0502", "E0505", "E0506", "E0515", "E0597", "E0716",
    ])
}

/// Compiler error codes for type and name-resolution failures.
fn default_correctness_codes() -> Vec<String> {
    to_strings(&[
        "E0277", "E0308", "E0412", "E0425", "E0433", "E0599", "E0603", "E0614",
    ])
}

/// Lint identifiers representing intentional, architecture-protected design
/// choices. Matched as substrings so both `needless_pass_by_value` and
/// `clippy::needless_pass_by_value` hit.
fn default_suppressed_codes() -> Vec<String> {
    to_strings(&[
        "needless_pass_by_value",
        "too_many_arguments",
        "module_name_repetitions",
        "type_complexity",
    ])
}

/// Message substrings that catch the suppressed lints when the source format
/// carried no code (free-text parses often lose the lint name).
fn default_suppressed_markers() -> Vec<String> {
    to_strings(&[
        "consider taking a reference instead of passing by value",
        "this function has too many arguments",
    ])
}

fn default_safety_keywords() -> Vec<String> {
    to_strings(&[
        "panic",
        "unwrap",
        "unsafe",
        "indexing",
        "index out of bounds",
        "unreachable",
        "overflow",
    ])
}

fn default_performance_keywords() -> Vec<String> {
    to_strings(&[
        "allocation",
        "allocating",
        "clone",
        "inefficient",
        "capacity",
    ])
}

fn default_documentation_keywords() -> Vec<String> {
    to_strings(&["missing documentation", "doc comment", "docs ", "undocumented"])
}

fn default_style_keywords() -> Vec<String> {
    to_strings(&["naming", "snake case", "convention", "formatting", "redundant"])
}

fn default_deprecation_keywords() -> Vec<String> {
    to_strings(&["deprecated", "deprecation", "obsolete", "superseded"])
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

/// Ordered classification rules mapping a diagnostic to a [`Category`].
///
/// Use [`Default::default()`] for the compiled-in project defaults, or load
/// an override file with [`from_json_file`](Self::from_json_file). Fields
/// missing from an override file keep their defaults.
///
/// # Examples
///
/// ```
/// use diag_sweep_core::{Category, CategoryPolicy, Diagnostic, Severity};
///
/// let policy = CategoryPolicy::default();
/// let diag = Diagnostic::new("unused import", Severity::Warning).with_code("E0308");
/// assert_eq!(policy.categorize(&diag), Category::Correctness);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CategoryPolicy {
    pub suppressed_codes: Vec<String>,
    pub suppressed_markers: Vec<String>,
    pub safety_codes: Vec<String>,
    pub correctness_codes: Vec<String>,
    pub safety_keywords: Vec<String>,
    pub performance_keywords: Vec<String>,
    pub documentation_keywords: Vec<String>,
    pub style_keywords: Vec<String>,
    pub deprecation_keywords: Vec<String>,
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            suppressed_codes: default_suppressed_codes(),
            suppressed_markers: default_suppressed_markers(),
            safety_codes: default_safety_codes(),
            correctness_codes: default_correctness_codes(),
            safety_keywords: default_safety_keywords(),
            performance_keywords: default_performance_keywords(),
            documentation_keywords: default_documentation_keywords(),
            style_keywords: default_style_keywords(),
            deprecation_keywords: default_deprecation_keywords(),
        }
    }
}

impl CategoryPolicy {
    /// Loads a policy override from a JSON file. Missing fields fall back
    /// to the compiled-in defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, PolicyError> {
        let raw = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let policy = serde_json::from_str(&raw).map_err(|source| PolicyError::Json {
            path: path.display().to_string(),
            source,
        })?;
        Ok(policy)
    }

    /// Assigns a taxonomy bucket to a diagnostic.
    ///
    /// Pure function of the diagnostic's `code` and `message`: calling it
    /// twice on the same diagnostic always yields the same category.
    pub fn categorize(&self, diagnostic: &Diagnostic) -> Category {
        let code = diagnostic
            .code
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let message = diagnostic.message.to_ascii_lowercase();

        // Suppression short-circuits everything else.
        if self.matches_suppression(&code, &message) {
            return Category::Suppressed;
        }

        if self.code_in(&code, &self.safety_codes) {
            return Category::Safety;
        }
        if self.code_in(&code, &self.correctness_codes) {
            return Category::Correctness;
        }

        let haystack = format!("{message} {code}");
        if contains_any(&haystack, &self.safety_keywords) {
            return Category::Safety;
        }
        if contains_any(&haystack, &self.performance_keywords) {
            return Category::Performance;
        }
        if contains_any(&haystack, &self.documentation_keywords) {
            return Category::Documentation;
        }
        if contains_any(&haystack, &self.style_keywords) {
            return Category::Style;
        }
        if contains_any(&haystack, &self.deprecation_keywords) {
            return Category::Deprecated;
        }

        Category::Correctness
    }

    fn matches_suppression(&self, code: &str, message: &str) -> bool {
        let code_hit = self
            .suppressed_codes
            .iter()
            .any(|entry| !entry.is_empty() && code.contains(&entry.to_ascii_lowercase()));
        if code_hit {
            return true;
        }
        self.suppressed_markers
            .iter()
            .any(|marker| !marker.is_empty() && message.contains(&marker.to_ascii_lowercase()))
    }

    fn code_in(&self, code: &str, table: &[String]) -> bool {
        !code.is_empty() && table.iter().any(|entry| code == entry.to_ascii_lowercase())
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|needle| !needle.is_empty() && haystack.contains(&needle.to_ascii_lowercase()))
}

/// Errors loading an external category policy file.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read category policy '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid category policy JSON '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}
