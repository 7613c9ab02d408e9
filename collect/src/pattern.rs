//! Run-scoped frequency tracking of recurring diagnostic patterns.
//!
//! Three independent counters — compiler error codes, lint codes, and
//! normalized message shapes — are fed every raw diagnostic before
//! suppression filtering, so trends in suppressed-but-frequent lints remain
//! visible to a reviewer even though the report body excludes them. The
//! tracker only ever produces advisory notes; it never affects
//! categorization or report filtering.
//!
//! Counters are the only cross-worker mutable state in a run and sit
//! behind mutexes supporting concurrent increment from the scheduler's
//! workers.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use diag_sweep_core::Diagnostic;
use parking_lot::Mutex;
use regex::Regex;

static BACKTICK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`]*`").unwrap());
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*""#).unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").unwrap());
static COMPILER_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[Ee]\d{4}$").unwrap());

/// Advisory threshold: a pattern must recur at least this often to be noted.
pub const RECURRENCE_THRESHOLD: usize = 3;

#[derive(Debug, Default)]
pub struct PatternTracker {
    compiler_codes: Mutex<BTreeMap<String, usize>>,
    lint_codes: Mutex<BTreeMap<String, usize>>,
    message_shapes: Mutex<BTreeMap<String, usize>>,
}

impl PatternTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one raw diagnostic. Safe to call from concurrent workers.
    pub fn observe(&self, diagnostic: &Diagnostic) {
        if let Some(code) = &diagnostic.code {
            let code = code.trim();
            if !code.is_empty() {
                if COMPILER_CODE_RE.is_match(code) {
                    *self.compiler_codes.lock().entry(code.to_string()).or_default() += 1;
                } else {
                    *self.lint_codes.lock().entry(code.to_string()).or_default() += 1;
                }
            }
        }

        let shape = normalize_shape(&diagnostic.message);
        if !shape.is_empty() {
            *self.message_shapes.lock().entry(shape).or_default() += 1;
        }
    }

    /// Advisory notes for patterns at or above the recurrence threshold,
    /// most frequent first.
    pub fn recurring_notes(&self, threshold: usize) -> Vec<String> {
        let mut entries: Vec<(usize, String)> = Vec::new();

        for (label, map) in [
            ("compiler error", &self.compiler_codes),
            ("lint", &self.lint_codes),
            ("message pattern", &self.message_shapes),
        ] {
            for (key, count) in map.lock().iter() {
                if *count >= threshold {
                    entries.push((*count, format!("{label} `{key}` recurs {count} times")));
                }
            }
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        entries.into_iter().map(|(_, note)| note).collect()
    }
}

/// Collapses identifiers, string literals, and numbers into placeholders so
/// structurally similar messages count as one pattern.
pub fn normalize_shape(message: &str) -> String {
    let shape = BACKTICK_RE.replace_all(message, "`_`");
    let shape = QUOTED_RE.replace_all(&shape, "\"_\"");
    let shape = NUMBER_RE.replace_all(&shape, "N");
    shape.trim().to_string()
}

#[cfg(test)]
mod tests {
    use diag_sweep_core::Severity;

    use super::*;

    fn diag(message: &str) -> Diagnostic {
        Diagnostic::new(message, Severity::Warning)
    }

    #[test]
    fn test_shape_normalization_groups_similar_messages() {
        assert_eq!(
            normalize_shape("unused variable: `alpha`"),
            normalize_shape("unused variable: `beta`"),
        );
        assert_eq!(
            normalize_shape("expected 2 arguments, found 3"),
            normalize_shape("expected 7 arguments, found 1"),
        );
        assert_eq!(
            normalize_shape(r#"invalid literal "abc""#),
            normalize_shape(r#"invalid literal "xyz""#),
        );
    }

    #[test]
    fn test_codes_split_between_compiler_and_lint_maps() {
        let tracker = PatternTracker::new();
        for _ in 0..3 {
            tracker.observe(&diag("mismatched types").with_code("E0308"));
            tracker.observe(&diag("redundant clone").with_code("redundant_clone"));
        }

        let notes = tracker.recurring_notes(RECURRENCE_THRESHOLD);
        assert!(notes.iter().any(|note| note.contains("compiler error `E0308`")));
        assert!(notes.iter().any(|note| note.contains("lint `redundant_clone`")));
    }

    #[test]
    fn test_below_threshold_patterns_stay_silent() {
        let tracker = PatternTracker::new();
        tracker.observe(&diag("one-off oddity"));
        tracker.observe(&diag("another one-off"));

        assert!(tracker.recurring_notes(RECURRENCE_THRESHOLD).is_empty());
    }

    #[test]
    fn test_notes_ordered_by_frequency() {
        let tracker = PatternTracker::new();
        for _ in 0..5 {
            tracker.observe(&diag("unused variable: `x`"));
        }
        for _ in 0..3 {
            tracker.observe(&diag("mismatched types"));
        }

        let notes = tracker.recurring_notes(RECURRENCE_THRESHOLD);
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("unused variable"));
        assert!(notes[0].contains("5 times"));
    }

    #[test]
    fn test_concurrent_observation_loses_nothing() {
        let tracker = PatternTracker::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        tracker.observe(&diag("unused variable: `x`"));
                    }
                });
            }
        });

        let notes = tracker.recurring_notes(1);
        assert!(notes.iter().any(|note| note.contains("200 times")));
    }
}
