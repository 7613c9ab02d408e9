//! Free-text parser for human-readable compiler blocks.
//!
//! Scans for `severity: message` header lines (including the standalone
//! `error[E0308]: message` form), then looks ahead a bounded window for the
//! block's location pointer (`--> file:line:col`), an actionable `help:`
//! suggestion, and a lint-attribute code marker. The look-ahead stops at the
//! next header so one block's trailing notes never bleed into the next
//! diagnostic. `note:`/`help:` lines are block members, not headers.

use std::sync::LazyLock;

use diag_sweep_core::{Diagnostic, Severity};
use regex::Regex;

use super::{ParseOptions, ParseStrategy};

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(error|warning|info|hint)(?:\[([A-Za-z0-9_:]+)\])?:\s*(.*)$").unwrap()
});

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-->\s*(.+?):(\d+)(?::(\d+))?\s*$").unwrap());

static LINT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#\[(?:warn|deny|allow|expect)\(([A-Za-z0-9_:]+)\)\]").unwrap()
});

/// Verbs that distinguish an actionable `help:` line from explanatory notes.
const ACTION_VERBS: &[&str] = &[
    "consider", "try", "use", "replace", "remove", "add", "change",
];

/// Look-ahead windows for block details, in lines past the header.
const LOOKAHEAD_DETAILED: usize = 12;
const LOOKAHEAD_COMPACT: usize = 6;

pub struct FreeTextStrategy;

impl ParseStrategy for FreeTextStrategy {
    fn name(&self) -> &'static str {
        "free-text"
    }

    fn parse(&self, text: &str, options: &ParseOptions) -> Vec<Diagnostic> {
        let lines: Vec<&str> = text.lines().collect();
        let window = if options.detailed {
            LOOKAHEAD_DETAILED
        } else {
            LOOKAHEAD_COMPACT
        };

        let mut diagnostics = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let Some(caps) = HEADER_RE.captures(lines[index].trim_start()) else {
                index += 1;
                continue;
            };

            let message = caps.get(3).map_or("", |m| m.as_str()).trim();
            if message.is_empty() {
                index += 1;
                continue;
            }

            let severity = Severity::from_label(caps.get(1).map_or("", |m| m.as_str()));
            let mut code = caps.get(2).map(|m| m.as_str().to_string());
            let mut location: Option<(String, Option<u32>, Option<u32>)> = None;
            let mut suggestion: Option<String> = None;

            // Bounded look-ahead for block details, stopping at the next
            // header line.
            let mut block_end = index;
            for peek_index in index + 1..lines.len().min(index + 1 + window) {
                let peek = lines[peek_index];
                if HEADER_RE.is_match(peek.trim_start()) {
                    break;
                }
                block_end = peek_index;

                if location.is_none() {
                    if let Some(loc) = LOCATION_RE.captures(peek) {
                        location = Some((
                            loc[1].to_string(),
                            loc[2].parse().ok(),
                            loc.get(3).and_then(|m| m.as_str().parse().ok()),
                        ));
                    }
                }
                if suggestion.is_none() {
                    suggestion = actionable_help(peek);
                }
                if code.is_none() {
                    if let Some(lint) = LINT_ATTR_RE.captures(peek) {
                        code = Some(lint[1].to_string());
                    }
                }
            }

            let mut diagnostic = Diagnostic::new(message, severity)
                .with_raw_context(lines[index..=block_end].join("\n"));
            if let Some(code) = code {
                diagnostic = diagnostic.with_code(code);
            }
            if let Some((file, line, column)) = location {
                diagnostic = diagnostic.with_location(file, line, column);
            }
            if let Some(suggestion) = suggestion {
                diagnostic = diagnostic.with_suggestion(suggestion);
            }

            diagnostics.push(diagnostic);
            index = block_end + 1;
        }

        diagnostics
    }
}

/// Extracts the suggestion text from a `help:` line when it contains an
/// actionable verb.
fn actionable_help(line: &str) -> Option<String> {
    let lower = line.to_ascii_lowercase();
    let position = lower.find("help:")?;
    let advice = line[position + "help:".len()..].trim();
    if advice.is_empty() {
        return None;
    }
    let advice_lower = lower[position + "help:".len()..].to_string();
    ACTION_VERBS
        .iter()
        .any(|verb| advice_lower.contains(verb))
        .then(|| advice.to_string())
}
