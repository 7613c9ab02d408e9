//! Tolerant decoding of raw tool output.
//!
//! [`decode_tool_output`] is a total function: whatever bytes a tool
//! produces, the caller gets text back. The cascade tries a strict UTF-8
//! decode first, then UTF-8 with replacement, and finally Latin-1 byte
//! widening, which accepts any input. Replacement is preferred while the
//! damage is small; output that is mostly non-UTF-8 is assumed to be a
//! single-byte encoding and widened instead so the content survives.

use std::borrow::Cow;

use tracing::debug;

/// Replacement-character ratio above which the lossy UTF-8 decode is
/// abandoned in favor of Latin-1 widening.
const MAX_REPLACEMENT_RATIO: f64 = 0.2;

/// Decodes raw tool output into parser-ready text. Never fails.
///
/// Control characters other than newline and tab are stripped (carriage
/// returns included, which normalizes CRLF line endings).
pub fn decode_tool_output(bytes: &[u8]) -> String {
    strip_control_chars(&decode_bytes(bytes))
}

fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(err) => {
            debug!(error = %err, len = bytes.len(), "strict UTF-8 decode failed");
            let lossy: Cow<'_, str> = String::from_utf8_lossy(bytes);
            let replacements = lossy.chars().filter(|ch| *ch == '\u{FFFD}').count();
            let ratio = replacements as f64 / lossy.chars().count().max(1) as f64;
            if ratio <= MAX_REPLACEMENT_RATIO {
                debug!(replacements, "decoded with UTF-8 replacement");
                lossy.into_owned()
            } else {
                debug!(replacements, "falling back to Latin-1 widening");
                bytes.iter().map(|byte| *byte as char).collect()
            }
        }
    }
}

fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|ch| *ch == '\n' || *ch == '\t' || !ch.is_control())
        .collect()
}
