use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_diag-sweep")
}

fn write_member(root: &Path, dir: &str, package: &str) {
    let member = root.join(dir);
    fs::create_dir_all(&member).unwrap();
    fs::write(
        member.join("Cargo.toml"),
        format!("[package]\nname = \"{package}\"\nversion = \"0.1.0\"\n"),
    )
    .unwrap();
}

/// Two-member workspace plus an exported problem list.
fn write_fixture(root: &Path) -> PathBuf {
    fs::write(
        root.join("Cargo.toml"),
        "[workspace]\nmembers = [\"alpha\", \"beta\"]\n",
    )
    .unwrap();
    write_member(root, "alpha", "alpha");
    write_member(root, "beta", "beta");

    let problems = root.join("problems.json");
    fs::write(
        &problems,
        serde_json::json!([
            {
                "resource": "alpha/src/lib.rs",
                "severity": 8,
                "message": "[E0308] mismatched types",
                "startLineNumber": 4,
                "startColumn": 2
            },
            {
                "resource": "beta/src/lib.rs",
                "severity": 4,
                "message": "used `unwrap()` on an `Option` value"
            }
        ])
        .to_string(),
    )
    .unwrap();
    problems
}

#[test]
fn import_writes_a_report_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let problems = write_fixture(dir.path());
    let report = dir.path().join("diagnostics-report.md");

    let output = Command::new(bin())
        .args([
            "import",
            "--workspace-root",
            dir.path().to_str().unwrap(),
            "--file",
            problems.to_str().unwrap(),
            "--output",
            report.to_str().unwrap(),
        ])
        .output()
        .expect("binary should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let rendered = fs::read_to_string(&report).unwrap();
    assert!(rendered.contains("# Workspace Diagnostics Report"));
    assert!(rendered.contains("## Unit: alpha"));
    assert!(rendered.contains("## Unit: beta"));
    assert!(rendered.contains("mismatched types"));
}

#[test]
fn second_run_archives_the_previous_report() {
    let dir = tempfile::tempdir().unwrap();
    let problems = write_fixture(dir.path());
    let report = dir.path().join("out/report.md");
    fs::create_dir_all(report.parent().unwrap()).unwrap();

    let run = || {
        Command::new(bin())
            .args([
                "import",
                "--workspace-root",
                dir.path().to_str().unwrap(),
                "--file",
                problems.to_str().unwrap(),
                "--output",
                report.to_str().unwrap(),
            ])
            .output()
            .expect("binary should run")
    };

    assert!(run().status.success());
    let first_content = fs::read_to_string(&report).unwrap();
    assert!(run().status.success());

    // The prior report moved into the default backup dir next to the output,
    // with a timestamp-suffixed name; the canonical path holds the new run.
    let backup_dir = report.parent().unwrap().join("report-archive");
    let archived: Vec<PathBuf> = fs::read_dir(&backup_dir)
        .unwrap()
        .flatten()
        .map(|entry| entry.path())
        .collect();
    assert_eq!(archived.len(), 1);
    let archived_name = archived[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(archived_name.starts_with("report-"));
    assert_eq!(fs::read_to_string(&archived[0]).unwrap(), first_content);
    assert!(report.exists());
}

#[test]
fn summary_path_writes_machine_readable_output() {
    let dir = tempfile::tempdir().unwrap();
    let problems = write_fixture(dir.path());
    let report = dir.path().join("report.md");
    let summary = dir.path().join("summary.json");

    let output = Command::new(bin())
        .args([
            "import",
            "--workspace-root",
            dir.path().to_str().unwrap(),
            "--file",
            problems.to_str().unwrap(),
            "--output",
            report.to_str().unwrap(),
            "--summary-path",
            summary.to_str().unwrap(),
        ])
        .output()
        .expect("binary should run");

    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(parsed["unit_count"], 2);
    assert_eq!(parsed["total_diagnostics"], 2);
}

#[test]
fn unknown_unit_filter_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let problems = write_fixture(dir.path());

    let output = Command::new(bin())
        .args([
            "import",
            "--workspace-root",
            dir.path().to_str().unwrap(),
            "--file",
            problems.to_str().unwrap(),
            "--output",
            dir.path().join("report.md").to_str().unwrap(),
            "--unit",
            "gamma",
        ])
        .output()
        .expect("binary should run");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("gamma"));
}

#[test]
fn empty_workspace_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let problems = dir.path().join("problems.json");
    fs::write(&problems, "[]").unwrap();

    let output = Command::new(bin())
        .args([
            "import",
            "--workspace-root",
            dir.path().to_str().unwrap(),
            "--file",
            problems.to_str().unwrap(),
            "--output",
            dir.path().join("report.md").to_str().unwrap(),
        ])
        .output()
        .expect("binary should run");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no analyzable units"));
}

#[test]
fn category_config_override_suppresses_custom_lints() {
    let dir = tempfile::tempdir().unwrap();
    let problems = write_fixture(dir.path());
    let report = dir.path().join("report.md");

    let policy = dir.path().join("policy.json");
    fs::write(&policy, r#"{"suppressed_codes": ["E0308"]}"#).unwrap();

    let output = Command::new(bin())
        .args([
            "import",
            "--workspace-root",
            dir.path().to_str().unwrap(),
            "--file",
            problems.to_str().unwrap(),
            "--output",
            report.to_str().unwrap(),
            "--category-config",
            policy.to_str().unwrap(),
        ])
        .output()
        .expect("binary should run");

    assert!(output.status.success());
    let rendered = fs::read_to_string(&report).unwrap();
    // The E0308 entry is suppressed by the override; the unwrap one stays.
    assert!(!rendered.contains("mismatched types"));
    assert!(rendered.contains("unwrap"));
}
