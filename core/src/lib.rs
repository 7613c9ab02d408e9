//! Core diagnostic model and categorization taxonomy.
//!
//! This crate defines the foundational types for workspace diagnostics
//! aggregation:
//!
//! - [`Diagnostic`] — one normalized finding (message, severity, optional
//!   code/location/suggestion, retained raw context).
//! - [`Severity`] — the fixed severity enum shared by all tool formats.
//! - [`Unit`] — one independently analyzable workspace member.
//! - [`AnalysisResult`] — the per-unit outcome: ordered categorized
//!   diagnostics plus per-category counts.
//! - [`Category`] / [`CategoryPolicy`] — the taxonomy and the heuristic
//!   classifier with its suppression rules.
//!
//! Validation ([`validate_diagnostic`], [`validate_result`]) checks the
//! invariants every producer must uphold: non-empty messages and no
//! suppressed findings leaking into counts.
//!
//! # Example
//!
//! ```
//! use diag_sweep_core::*;
//!
//! let policy = CategoryPolicy::default();
//! let diag = Diagnostic::new("used `unwrap()` on an `Option` value", Severity::Warning)
//!     .with_code("unwrap_used")
//!     .with_location("src/lib.rs", Some(42), Some(9));
//!
//! assert_eq!(policy.categorize(&diag), Category::Safety);
//! assert!(validate_diagnostic(&diag).is_empty());
//! ```

mod category;
mod types;
mod validate;

pub use category::{CategoryPolicy, PolicyError};
pub use types::*;
pub use validate::{ValidationError, validate_diagnostic, validate_result};
