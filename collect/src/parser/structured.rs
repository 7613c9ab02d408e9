//! Structured-record parser for newline-delimited JSON tool output.
//!
//! Cargo's `--message-format=json` emits one independent JSON record per
//! line. Two shapes carry diagnostics: cargo wrapper records with
//! `"reason":"compiler-message"` nesting the rustc diagnostic under
//! `message`, and bare rustc records where the diagnostic fields sit at the
//! top level with `message` as a string. Every other record kind
//! (`compiler-artifact`, `build-finished`, ...) is ignored, and a malformed
//! line is skipped rather than failing the parse.

use diag_sweep_core::{Diagnostic, Severity};
use serde::Deserialize;
use tracing::debug;

use super::{ParseOptions, ParseStrategy};

/// One rustc diagnostic record. Every field is optional-with-default so a
/// record carrying only a subset still decodes.
#[derive(Debug, Clone, Default, Deserialize)]
struct MessageRecord {
    #[serde(default)]
    message: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    code: Option<CodeRecord>,
    #[serde(default)]
    spans: Vec<SpanRecord>,
    #[serde(default)]
    children: Vec<MessageRecord>,
    #[serde(default)]
    rendered: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CodeRecord {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SpanRecord {
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    line_start: Option<u32>,
    #[serde(default)]
    column_start: Option<u32>,
    #[serde(default)]
    is_primary: bool,
}

/// Cargo wrapper record around a rustc diagnostic.
#[derive(Debug, Default, Deserialize)]
struct WrapperRecord {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<MessageRecord>,
}

pub struct StructuredStrategy;

impl ParseStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured-records"
    }

    fn parse(&self, text: &str, _options: &ParseOptions) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if !line.starts_with('{') {
                continue;
            }

            let Some(record) = decode_record(line) else {
                debug!(line = index + 1, "skipping malformed record");
                continue;
            };

            if let Some(diagnostic) = to_diagnostic(record) {
                diagnostics.push(diagnostic);
            }
        }

        diagnostics
    }
}

fn decode_record(line: &str) -> Option<MessageRecord> {
    // Cargo wrapper first: the discriminator tells us whether the record is
    // a compiler message at all.
    if let Ok(wrapper) = serde_json::from_str::<WrapperRecord>(line) {
        match (wrapper.reason.as_deref(), wrapper.message) {
            (Some("compiler-message"), message) => return message,
            (Some(_), _) => return None,
            (None, Some(message)) => return Some(message),
            (None, None) => {}
        }
    }

    // Bare rustc form: the diagnostic fields sit at the top level and
    // `message` is a string. The wrapper decode fails on that shape.
    let bare = serde_json::from_str::<MessageRecord>(line).ok()?;
    if bare.message.is_empty() { None } else { Some(bare) }
}

fn to_diagnostic(record: MessageRecord) -> Option<Diagnostic> {
    let message = record.message.trim();
    if message.is_empty() || is_summary_message(message) {
        return None;
    }

    let mut diagnostic = Diagnostic::new(message, Severity::from_label(&record.level));

    if let Some(code) = record.code.and_then(|code| code.code) {
        diagnostic = diagnostic.with_code(code);
    }

    let primary = record
        .spans
        .iter()
        .find(|span| span.is_primary)
        .or_else(|| record.spans.first());
    if let Some(span) = primary {
        if let Some(file) = &span.file_name {
            diagnostic = diagnostic.with_location(file.clone(), span.line_start, span.column_start);
        }
    }

    let help = record
        .children
        .iter()
        .find(|child| child.level == "help" && !child.message.trim().is_empty());
    if let Some(help) = help {
        diagnostic = diagnostic.with_suggestion(help.message.trim());
    }

    if let Some(rendered) = record.rendered {
        diagnostic = diagnostic.with_raw_context(rendered.trim_end());
    }

    Some(diagnostic)
}

/// Run-summary records ("4 warnings emitted", "aborting due to ...") are
/// bookkeeping, not findings.
fn is_summary_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.starts_with("aborting due to")
        || (lower.contains("warning") && lower.contains("emitted"))
        || (lower.contains("error") && lower.contains("emitted"))
}
