//! Archival of prior reports before a new one is written.
//!
//! The canonical report path is moved — not copied — into a backup
//! directory with a timestamp suffix, so the canonical path is immediately
//! writable afterwards. Backup directory creation is idempotent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

/// Moves an existing report into the backup directory.
///
/// Returns the backup path when a file was archived, `None` when the
/// canonical path had nothing to archive. A second archival within the same
/// second gets a numeric tiebreak rather than overwriting.
pub fn archive_existing(report_path: &Path, backup_dir: &Path) -> io::Result<Option<PathBuf>> {
    if !report_path.exists() {
        return Ok(None);
    }

    fs::create_dir_all(backup_dir)?;

    let stem = report_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let extension = report_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");

    let mut candidate = backup_dir.join(format!("{stem}-{timestamp}{extension}"));
    let mut tiebreak = 1;
    while candidate.exists() {
        candidate = backup_dir.join(format!("{stem}-{timestamp}-{tiebreak}{extension}"));
        tiebreak += 1;
    }

    fs::rename(report_path, &candidate)?;
    info!(
        from = %report_path.display(),
        to = %candidate.display(),
        "archived previous report"
    );
    Ok(Some(candidate))
}
