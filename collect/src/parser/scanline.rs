//! Last-resort line scanner.
//!
//! Only reached when the structured and free-text strategies both yield
//! nothing. Performs a plain substring match for `error:` / `warning:`
//! anywhere in a line and emits a minimal diagnostic from the remainder.

use diag_sweep_core::{Diagnostic, Severity};

use super::{ParseOptions, ParseStrategy};

pub struct LineScanStrategy;

impl ParseStrategy for LineScanStrategy {
    fn name(&self) -> &'static str {
        "line-scan"
    }

    fn parse(&self, text: &str, _options: &ParseOptions) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for line in text.lines() {
            let Some((severity, rest)) = split_at_marker(line) else {
                continue;
            };
            let message = rest.trim();
            if message.is_empty() {
                continue;
            }
            diagnostics.push(Diagnostic::new(message, severity).with_raw_context(line.trim_end()));
        }

        diagnostics
    }
}

fn split_at_marker(line: &str) -> Option<(Severity, &str)> {
    // Prefer the error marker when a line carries both.
    if let Some(position) = line.find("error:") {
        return Some((Severity::Error, &line[position + "error:".len()..]));
    }
    if let Some(position) = line.find("warning:") {
        return Some((Severity::Warning, &line[position + "warning:".len()..]));
    }
    None
}
