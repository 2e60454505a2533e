//! CLI integration tests for the fusejob command-line interface.
//!
//! Jobs run against shell-script strategies from a temporary config file,
//! so no real tool installation is needed.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the fusejob binary.
fn fusejob() -> Command {
    let mut cmd = Command::cargo_bin("fusejob").unwrap();
    cmd.env_remove("FUSEJOB_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// Write a config whose catalog is `strategies` (TOML `[[strategy]]` blocks).
fn write_config(dir: &Path, strategies: &str) -> PathBuf {
    let path = dir.join("fusejob.toml");
    let toml = format!(
        r#"
[tool]
tool_dir = "{tool}"

[workspace]
root = "{jobs}"

{strategies}
"#,
        tool = dir.join("tool").display(),
        jobs = dir.join("jobs").display(),
    );
    std::fs::create_dir_all(dir.join("tool")).unwrap();
    std::fs::write(&path, toml).unwrap();
    path
}

const WRITER: &str = r#"
[[strategy]]
name = "broken-flags"
program = "/bin/sh"
args = ["-c", 'echo "error: unrecognized arguments" >&2; exit 2']

[[strategy]]
name = "writer"
program = "/bin/sh"
args = ["-c", 'head -c 4000 /dev/zero > "$1"', "sh", "{output}"]
"#;

const FAILING: &str = r#"
[[strategy]]
name = "only"
program = "/bin/sh"
args = ["-c", 'echo "no such option" >&2; exit 1']
"#;

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let source = dir.join("face.jpg");
    let target = dir.join("clip.mp4");
    std::fs::write(&source, [0xFF, 0xD8, 0xFF, 0xE0, 0, 16]).unwrap();
    std::fs::write(&target, b"\0\0\0\x18ftypisom\0\0\0\0").unwrap();
    (source, target)
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    fusejob()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("job"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("diagnose"))
        .stdout(predicate::str::contains("strategies"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_version_displays() {
    fusejob()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fusejob"));
}

#[test]
fn test_run_requires_inputs() {
    fusejob()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--source"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_strategies_default_catalog() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "");

    fusejob()
        .args(["--config", config.to_str().unwrap(), "strategies", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("script-long-flags"))
        .stdout(predicate::str::contains("script-cpu-only"))
        .stdout(predicate::str::contains("CUDA_VISIBLE_DEVICES="));
}

#[test]
fn test_invalid_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.toml");
    std::fs::write(&path, "[[strategy]]\nname = \"\"\nprogram = \"x\"\n").unwrap();

    fusejob()
        .args(["--config", path.to_str().unwrap(), "strategies"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Jobs
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_run_falls_back_and_writes_output() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), WRITER);
    let (source, target) = write_inputs(tmp.path());
    let out = tmp.path().join("result.mp4");

    let assert = fusejob()
        .args([
            "--config",
            config.to_str().unwrap(),
            "run",
            "--source",
            source.to_str().unwrap(),
            "--target",
            target.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let response: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["strategy"], "writer");
    assert_eq!(response["size"], 4000);
    assert_eq!(std::fs::read(&out).unwrap().len(), 4000);

    // Job workspace is gone.
    assert_eq!(std::fs::read_dir(tmp.path().join("jobs")).unwrap().count(), 0);
}

#[test]
fn test_run_all_failing_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), FAILING);
    let (source, target) = write_inputs(tmp.path());

    fusejob()
        .args([
            "--config",
            config.to_str().unwrap(),
            "run",
            "-s",
            source.to_str().unwrap(),
            "-t",
            target.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("All strategies failed"))
        .stdout(predicate::str::contains("no such option"));
}

#[test]
fn test_job_from_stdin_rejects_missing_target() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), WRITER);

    fusejob()
        .args(["--config", config.to_str().unwrap(), "job", "-"])
        .write_stdin(r#"{"id": "j1", "input": {"source": "aGVsbG8="}}"#)
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid_request"))
        .stdout(predicate::str::contains("missing 'target'"));
}

#[test]
fn test_job_file_health_action() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "");
    let job = tmp.path().join("job.json");
    std::fs::write(&job, r#"{"input": {"action": "health"}}"#).unwrap();

    fusejob()
        .args(["--config", config.to_str().unwrap(), "job", job.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tool_present\":false"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_health_without_tool_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "");

    fusejob()
        .args(["--config", config.to_str().unwrap(), "health", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"tool_present\": false"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_spells_out_catalog() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), FAILING);

    fusejob()
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[timeouts]"))
        .stdout(predicate::str::contains("name = \"only\""))
        .stdout(predicate::str::contains("script-long-flags").not());
}

#[test]
fn test_config_init_writes_loadable_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "");
    let target = tmp.path().join("init/fusejob.toml");

    fusejob()
        .args(["--config", config.to_str().unwrap(), "config", "init", "--path"])
        .arg(&target)
        .assert()
        .success();

    fusejob()
        .args(["--config", target.to_str().unwrap(), "strategies", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("script-long-flags"));

    fusejob()
        .args(["--config", config.to_str().unwrap(), "config", "init", "--path"])
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
