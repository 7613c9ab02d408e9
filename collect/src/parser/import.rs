//! Import of externally exported problem lists.
//!
//! An editor's problem panel exports entries with a resource path, an
//! integer severity on the marker scale (8 error, 4 warning, 2 info,
//! 1 hint), a message, and a position. This module turns such a file —
//! JSON array or newline-delimited records — into diagnostics without any
//! process invocation, and attributes each entry to its owning unit by the
//! longest matching path prefix.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use diag_sweep_core::{Diagnostic, Severity, Unit};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

/// `[CODE]` token embedded in an exported message.
static EMBEDDED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z][A-Za-z0-9_:\-]*)\]").unwrap());

/// One exported problem entry. Every field is optional so partially
/// populated exports still import.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProblemEntry {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub severity: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "startLineNumber")]
    pub start_line: Option<u32>,
    #[serde(default, rename = "startColumn")]
    pub start_column: Option<u32>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

/// Parses an exported problem list (JSON array or NDJSON) into diagnostics,
/// preserving entry order. Malformed NDJSON lines are skipped.
pub fn parse_problem_list(text: &str) -> Vec<Diagnostic> {
    load_entries(text)
        .into_iter()
        .filter_map(entry_to_diagnostic)
        .collect()
}

/// Groups imported diagnostics by owning unit.
///
/// The owner is the unit whose path is the longest prefix of the entry's
/// resource path; entries matching no unit fall into the first unit (the
/// workspace root in root-only layouts). Returned map preserves unit names
/// only for units that received at least one diagnostic.
pub fn assign_to_units(
    diagnostics: Vec<Diagnostic>,
    units: &[Unit],
) -> BTreeMap<String, Vec<Diagnostic>> {
    let mut grouped: BTreeMap<String, Vec<Diagnostic>> = BTreeMap::new();

    for diagnostic in diagnostics {
        let owner = diagnostic
            .file_path
            .as_deref()
            .and_then(|path| owning_unit(path, units))
            .or_else(|| units.first())
            .map(|unit| unit.name.clone());
        let Some(owner) = owner else {
            continue;
        };
        grouped.entry(owner).or_default().push(diagnostic);
    }

    grouped
}

fn owning_unit<'a>(path: &str, units: &'a [Unit]) -> Option<&'a Unit> {
    let normalized = path.trim_start_matches('/');
    units
        .iter()
        .filter(|unit| {
            let prefix = unit.path.to_string_lossy();
            let prefix = prefix.trim_start_matches("./").trim_start_matches('/');
            if prefix.is_empty() || prefix == "." {
                return false;
            }
            // Exported resources may be absolute while unit paths are
            // workspace-relative, so an interior match also counts.
            normalized == prefix
                || normalized.starts_with(&format!("{prefix}/"))
                || normalized.contains(&format!("/{prefix}/"))
        })
        .max_by_key(|unit| unit.path.to_string_lossy().len())
}

fn load_entries(text: &str) -> Vec<ProblemEntry> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<ProblemEntry>>(trimmed) {
            Ok(entries) => return entries,
            Err(err) => {
                debug!(error = %err, "problem list is not a valid JSON array, trying NDJSON");
            }
        }
    }

    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            match serde_json::from_str::<ProblemEntry>(line) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(error = %err, "skipping malformed problem entry");
                    None
                }
            }
        })
        .collect()
}

fn entry_to_diagnostic(entry: ProblemEntry) -> Option<Diagnostic> {
    let raw_message = entry.message.unwrap_or_default();
    let mut code = code_from_value(entry.code);

    // Prefer an explicit code field; otherwise pull an embedded [CODE]
    // token out of the message. Either way the token is stripped from the
    // displayed text.
    let message = match EMBEDDED_CODE_RE.captures(&raw_message) {
        Some(caps) => {
            if code.is_none() {
                code = Some(caps[1].to_string());
            }
            let token = caps.get(0).map_or("", |m| m.as_str());
            raw_message.replacen(token, "", 1).trim().to_string()
        }
        None => raw_message.trim().to_string(),
    };

    if message.is_empty() {
        return None;
    }

    let mut diagnostic = Diagnostic::new(message, severity_from_marker(entry.severity));
    if let Some(code) = code {
        diagnostic = diagnostic.with_code(code);
    }
    if let Some(resource) = entry.resource {
        diagnostic = diagnostic.with_location(resource, entry.start_line, entry.start_column);
    }
    Some(diagnostic)
}

/// Maps the editor marker severity scale to the internal enum. Unknown
/// values degrade to warnings so the import stays total.
fn severity_from_marker(value: Option<i64>) -> Severity {
    match value {
        Some(8) => Severity::Error,
        Some(4) => Severity::Warning,
        Some(2) => Severity::Info,
        Some(1) => Severity::Hint,
        _ => Severity::Warning,
    }
}

fn code_from_value(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(code) => Some(code),
        serde_json::Value::Object(map) => map
            .get("value")
            .and_then(|v| v.as_str())
            .map(String::from),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
