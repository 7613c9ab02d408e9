//! Unit discovery over workspace manifest files.
//!
//! Units are found once at run start, in a fixed fallback order: the root
//! manifest's `[workspace].members` table (glob entries expanded), then a
//! bounded walk for nested manifests, then the root itself as a single
//! unit. Discovery order is the report order for the rest of the run.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use diag_sweep_core::Unit;
use tracing::{debug, warn};

use crate::RunError;

/// Directories never entered during the manifest walk.
const WALK_SKIP_DIRS: &[&str] = &["target", "node_modules"];

/// Maximum directory depth for the manifest walk fallback.
const WALK_MAX_DEPTH: usize = 4;

/// Discovers analyzable units under a workspace root.
///
/// Returns an error only when nothing analyzable exists at all — the fatal
/// case of the run's error taxonomy.
pub fn discover_units(root: &Path) -> Result<Vec<Unit>, RunError> {
    let mut units = units_from_workspace_members(root);

    if units.is_empty() {
        debug!(root = %root.display(), "no workspace members, walking for manifests");
        units = units_from_manifest_walk(root);
    }

    if units.is_empty() && root.join("Cargo.toml").is_file() {
        debug!(root = %root.display(), "treating the root itself as one unit");
        units.push(Unit::new(unit_name_from_manifest(root), root));
    }

    if units.is_empty() {
        return Err(RunError::NoUnits(root.display().to_string()));
    }

    Ok(dedupe_by_name(units))
}

/// Restricts discovered units to the requested names.
///
/// Every filter must match at least one unit; a filter that matches nothing
/// is fatal, surfacing typos instead of silently analyzing nothing.
pub fn filter_units(units: Vec<Unit>, filters: &[String]) -> Result<Vec<Unit>, RunError> {
    if filters.is_empty() {
        return Ok(units);
    }

    for filter in filters {
        if !units.iter().any(|unit| unit.name == *filter) {
            return Err(RunError::FilterMismatch(filter.clone()));
        }
    }

    Ok(units
        .into_iter()
        .filter(|unit| filters.iter().any(|filter| unit.name == *filter))
        .collect())
}

fn units_from_workspace_members(root: &Path) -> Vec<Unit> {
    let manifest_path = root.join("Cargo.toml");
    let Ok(raw) = fs::read_to_string(&manifest_path) else {
        return Vec::new();
    };
    let Ok(manifest) = raw.parse::<toml::Value>() else {
        warn!(path = %manifest_path.display(), "root manifest is not valid TOML");
        return Vec::new();
    };

    let Some(members) = manifest
        .get("workspace")
        .and_then(|workspace| workspace.get("members"))
        .and_then(|members| members.as_array())
    else {
        return Vec::new();
    };

    let mut units = Vec::new();
    for member in members.iter().filter_map(|member| member.as_str()) {
        if member.contains('*') {
            units.extend(expand_member_glob(root, member));
        } else {
            let dir = root.join(member);
            if dir.join("Cargo.toml").is_file() {
                units.push(Unit::new(unit_name_from_manifest(&dir), dir));
            } else {
                warn!(member, "workspace member has no manifest, skipping");
            }
        }
    }
    units
}

/// Expands a `dir/*` member entry by scanning for immediate subdirectories
/// holding a manifest. Entries are sorted for deterministic discovery order.
fn expand_member_glob(root: &Path, member: &str) -> Vec<Unit> {
    let Some(parent) = member.split('*').next() else {
        return Vec::new();
    };
    let parent_dir = root.join(parent.trim_end_matches('/'));
    let Ok(entries) = fs::read_dir(&parent_dir) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join("Cargo.toml").is_file())
        .collect();
    dirs.sort();

    dirs.into_iter()
        .map(|dir| Unit::new(unit_name_from_manifest(&dir), dir))
        .collect()
}

fn units_from_manifest_walk(root: &Path) -> Vec<Unit> {
    let mut found = Vec::new();
    walk_for_manifests(root, 0, &mut found);
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

fn walk_for_manifests(dir: &Path, depth: usize, found: &mut Vec<Unit>) {
    if depth > WALK_MAX_DEPTH {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || WALK_SKIP_DIRS.contains(&name.as_ref()) {
            continue;
        }
        if path.join("Cargo.toml").is_file() {
            found.push(Unit::new(unit_name_from_manifest(&path), path.clone()));
            // A manifest marks a unit boundary; nested members below it
            // belong to that unit's own workspace.
            continue;
        }
        walk_for_manifests(&path, depth + 1, found);
    }
}

/// Reads `[package].name` from a directory's manifest, falling back to the
/// directory basename.
fn unit_name_from_manifest(dir: &Path) -> String {
    let fallback = || {
        dir.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string())
    };

    let Ok(raw) = fs::read_to_string(dir.join("Cargo.toml")) else {
        return fallback();
    };
    raw.parse::<toml::Value>()
        .ok()
        .and_then(|manifest| {
            manifest
                .get("package")
                .and_then(|package| package.get("name"))
                .and_then(|name| name.as_str())
                .map(String::from)
        })
        .unwrap_or_else(fallback)
}

fn dedupe_by_name(units: Vec<Unit>) -> Vec<Unit> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut deduped = Vec::with_capacity(units.len());
    for unit in units {
        if seen.insert(unit.name.clone()) {
            deduped.push(unit);
        } else {
            warn!(name = %unit.name, path = %unit.path.display(), "duplicate unit name, keeping first");
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("Cargo.toml"),
            format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n"),
        )
        .unwrap();
    }

    #[test]
    fn test_workspace_members_discovered_in_manifest_order() {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"beta\", \"alpha\"]\n",
        )
        .unwrap();
        write_manifest(&root.path().join("beta"), "beta-pkg");
        write_manifest(&root.path().join("alpha"), "alpha-pkg");

        let units = discover_units(root.path()).unwrap();
        let names: Vec<&str> = units.iter().map(|unit| unit.name.as_str()).collect();
        assert_eq!(names, vec!["beta-pkg", "alpha-pkg"]);
    }

    #[test]
    fn test_member_globs_expand_sorted() {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"crates/*\"]\n",
        )
        .unwrap();
        write_manifest(&root.path().join("crates/zeta"), "zeta");
        write_manifest(&root.path().join("crates/acme"), "acme");

        let units = discover_units(root.path()).unwrap();
        let names: Vec<&str> = units.iter().map(|unit| unit.name.as_str()).collect();
        assert_eq!(names, vec!["acme", "zeta"]);
    }

    #[test]
    fn test_manifest_walk_fallback() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(&root.path().join("tools/helper"), "helper");

        let units = discover_units(root.path()).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "helper");
    }

    #[test]
    fn test_root_package_is_a_single_unit() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(root.path(), "solo");

        let units = discover_units(root.path()).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "solo");
    }

    #[test]
    fn test_empty_root_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_units(root.path()),
            Err(RunError::NoUnits(_))
        ));
    }

    #[test]
    fn test_filter_mismatch_is_fatal() {
        let units = vec![Unit::new("core", "core")];
        let result = filter_units(units, &["nope".to_string()]);
        assert!(matches!(result, Err(RunError::FilterMismatch(name)) if name == "nope"));
    }

    #[test]
    fn test_filter_keeps_matching_units() {
        let units = vec![Unit::new("core", "core"), Unit::new("cli", "cli")];
        let filtered = filter_units(units, &["cli".to_string()]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "cli");
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let units = vec![
            Unit::new("dup", "a"),
            Unit::new("dup", "b"),
            Unit::new("other", "c"),
        ];
        let deduped = dedupe_by_name(units);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].path, PathBuf::from("a"));
    }
}
