//! Parsing strategies for heterogeneous tool output.
//!
//! Tool output arrives in three shapes: newline-delimited JSON records
//! (cargo's `--message-format=json`), free-text compiler blocks, and — as a
//! last resort — anything at all with `error:`/`warning:` substrings.
//! Each shape has a strategy implementing [`ParseStrategy`]; the cascade in
//! [`parse_with_fallbacks`] tries them in order and stops at the first
//! strategy yielding at least one diagnostic, so the same finding is never
//! counted twice under different parses.
//!
//! Externally exported problem lists are handled by the [`import`] module,
//! which is a separate entry point rather than a cascade member: imports
//! replace tool invocation entirely.
//!
//! All strategies are total and order-preserving, and none may emit a
//! diagnostic with an empty message.

mod freetext;
mod scanline;
mod structured;

pub mod import;

use diag_sweep_core::Diagnostic;
use tracing::debug;

pub use freetext::FreeTextStrategy;
pub use scanline::LineScanStrategy;
pub use structured::StructuredStrategy;

/// Options shared by all parsing strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Widens the free-text look-ahead window and retains fuller context.
    pub detailed: bool,
}

/// A single parsing strategy over decoded tool output.
pub trait ParseStrategy {
    fn name(&self) -> &'static str;

    /// Extracts diagnostics in first-occurrence order. Total: malformed
    /// input yields fewer diagnostics, never an error.
    fn parse(&self, text: &str, options: &ParseOptions) -> Vec<Diagnostic>;
}

/// The ordered strategy chain for tool output.
pub fn default_cascade() -> Vec<Box<dyn ParseStrategy + Send + Sync>> {
    vec![
        Box::new(StructuredStrategy),
        Box::new(FreeTextStrategy),
        Box::new(LineScanStrategy),
    ]
}

/// Tries each strategy in order, returning the first non-empty yield
/// together with the winning strategy's name.
pub fn parse_with_fallbacks(
    text: &str,
    options: &ParseOptions,
) -> Option<(Vec<Diagnostic>, &'static str)> {
    if text.trim().is_empty() {
        return None;
    }

    for strategy in default_cascade() {
        let found = strategy.parse(text, options);
        if !found.is_empty() {
            debug!(
                strategy = strategy.name(),
                count = found.len(),
                "parsing strategy accepted"
            );
            return Some((found, strategy.name()));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_prefers_structured_records() {
        let text = r#"{"reason":"compiler-message","message":{"message":"unused variable: `x`","level":"warning","spans":[]}}"#;
        let (found, strategy) = parse_with_fallbacks(text, &ParseOptions::default()).unwrap();
        assert_eq!(strategy, "structured-records");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_cascade_falls_through_to_free_text() {
        let text = "warning: unused import\n --> b.rs:10:1\n";
        let (found, strategy) = parse_with_fallbacks(text, &ParseOptions::default()).unwrap();
        assert_eq!(strategy, "free-text");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_cascade_reaches_line_scan_last() {
        // No header pattern, only an embedded marker mid-line.
        let text = "some prefix text warning: something odd happened\n";
        let (found, strategy) = parse_with_fallbacks(text, &ParseOptions::default()).unwrap();
        assert_eq!(strategy, "line-scan");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_cascade_returns_none_for_silent_output() {
        assert!(parse_with_fallbacks("", &ParseOptions::default()).is_none());
        assert!(parse_with_fallbacks("Compiling foo v0.1.0\n", &ParseOptions::default()).is_none());
    }

    #[test]
    fn test_all_strategies_uphold_non_empty_message_invariant() {
        let inputs = [
            r#"{"reason":"compiler-message","message":{"message":"","level":"warning"}}"#,
            "warning: \n",
            "error:\n",
        ];
        for input in inputs {
            for strategy in default_cascade() {
                for diag in strategy.parse(input, &ParseOptions::default()) {
                    assert!(
                        !diag.message.trim().is_empty(),
                        "{} emitted an empty message",
                        strategy.name()
                    );
                }
            }
        }
    }
}
