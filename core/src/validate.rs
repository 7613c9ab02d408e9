//! Diagnostic well-formedness checks.
//!
//! Validates the invariants every parser must uphold before a diagnostic
//! enters the pipeline: a non-empty message and, for analysis results, no
//! suppressed entries in the category counts. Parsers filter at the source;
//! these checks exist for the import path (externally produced data) and
//! for tests asserting the pipeline contract.

use thiserror::Error;

use crate::{AnalysisResult, Category, Diagnostic};

/// Invariant violations in diagnostics or analysis results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Diagnostic message is empty or whitespace-only.
    #[error("diagnostic message cannot be empty")]
    EmptyMessage,
    /// An analysis result counts suppressed findings.
    #[error("category counts must not include suppressed findings ({0} counted)")]
    SuppressedInCounts(usize),
    /// Category counts disagree with the diagnostics list.
    #[error("category counts total {counted} but {listed} diagnostics are listed")]
    CountMismatch { counted: usize, listed: usize },
}

/// Validates a single diagnostic.
pub fn validate_diagnostic(diagnostic: &Diagnostic) -> Vec<ValidationError> {
    if diagnostic.message.trim().is_empty() {
        vec![ValidationError::EmptyMessage]
    } else {
        Vec::new()
    }
}

/// Validates a per-unit analysis result.
///
/// Checks every diagnostic, that no suppressed findings leaked into the
/// counts, and that the counts sum to the number of listed diagnostics.
pub fn validate_result(result: &AnalysisResult) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (_, diagnostic) in &result.diagnostics {
        errors.extend(validate_diagnostic(diagnostic));
        if !errors.is_empty() {
            return errors;
        }
    }

    if let Some(count) = result.category_counts.get(&Category::Suppressed) {
        errors.push(ValidationError::SuppressedInCounts(*count));
        return errors;
    }

    let counted: usize = result.category_counts.values().sum();
    let listed = result.diagnostics.len();
    if counted != listed {
        errors.push(ValidationError::CountMismatch { counted, listed });
    }

    errors
}

#[cfg(test)]
mod tests {
    use crate::Severity;

    use super::*;

    #[test]
    fn test_empty_message_is_rejected() {
        let diag = Diagnostic::new("   ", Severity::Warning);
        assert_eq!(validate_diagnostic(&diag), vec![ValidationError::EmptyMessage]);
    }

    #[test]
    fn test_non_empty_message_passes() {
        let diag = Diagnostic::new("unused import", Severity::Warning);
        assert!(validate_diagnostic(&diag).is_empty());
    }

    #[test]
    fn test_suppressed_counts_are_rejected() {
        let mut result = AnalysisResult::empty("core");
        result.category_counts.insert(Category::Suppressed, 2);

        let errors = validate_result(&result);
        assert_eq!(errors, vec![ValidationError::SuppressedInCounts(2)]);
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let mut result = AnalysisResult::empty("core");
        result.diagnostics.push((
            Category::Style,
            Diagnostic::new("variable naming", Severity::Warning),
        ));

        let errors = validate_result(&result);
        assert_eq!(
            errors,
            vec![ValidationError::CountMismatch {
                counted: 0,
                listed: 1
            }]
        );
    }

    #[test]
    fn test_consistent_result_passes() {
        let mut result = AnalysisResult::empty("core");
        result.diagnostics.push((
            Category::Style,
            Diagnostic::new("variable naming", Severity::Warning),
        ));
        result.category_counts.insert(Category::Style, 1);

        assert!(validate_result(&result).is_empty());
    }
}
