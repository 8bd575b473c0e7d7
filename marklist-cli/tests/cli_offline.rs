use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const CONFIG: &str = "\
data_dir: db
sources:
  - identifier: owner/awesome
    files: [README.md]
  - identifier: owner/retired
    files: [README.md]
    skip: true
";

fn write_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("marklist.yaml");
    fs::write(&path, CONFIG).expect("write config");
    path
}

fn marklist_cmd(config: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("marklist"));
    cmd.arg("--config")
        .arg(config)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "warn")
        .env_remove("GITHUB_TOKEN");
    cmd
}

#[test]
fn status_json_before_first_sync() {
    let dir = TempDir::new().expect("tmp");
    let config = write_config(&dir);

    let assert = marklist_cmd(&config)
        .args(["status", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("status JSON");

    let sources = json["sources"].as_array().expect("sources array");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["identifier"], "owner/awesome");
    assert_eq!(sources[0]["status"], "never_synced");
    assert_eq!(sources[0]["items"], 0);
    assert_eq!(sources[1]["status"], "disabled");
}

#[test]
fn status_table_lists_sources() {
    let dir = TempDir::new().expect("tmp");
    let config = write_config(&dir);

    marklist_cmd(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(contains("owner/awesome"))
        .stdout(contains("NEVER SYNCED"))
        .stdout(contains("2 sources"));
}

#[test]
fn sync_skips_unknown_and_disabled_sources_without_network() {
    let dir = TempDir::new().expect("tmp");
    let config = write_config(&dir);

    marklist_cmd(&config)
        .args(["sync", "owner/ghost", "owner/retired"])
        .assert()
        .success()
        .stdout(contains("'owner/ghost' skipped (not configured)"))
        .stdout(contains("'owner/retired' skipped (disabled)"));

    let meta = dir.path().join("db").join("meta.json");
    assert!(meta.exists(), "checkpoint should be written even when nothing ran");
}

#[test]
fn sync_json_reports_outcomes() {
    let dir = TempDir::new().expect("tmp");
    let config = write_config(&dir);

    let assert = marklist_cmd(&config)
        .args(["sync", "--json", "owner/ghost", "owner/retired"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("run report JSON");

    let sources = json["sources"].as_array().expect("sources array");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["identifier"], "owner/ghost");
    assert_eq!(sources[0]["outcome"], "skipped");
    assert_eq!(sources[0]["reason"], "unconfigured");
    assert_eq!(sources[1]["reason"], "disabled");
    assert_eq!(json["invalid_files"].as_array().map(Vec::len), Some(0));
}

#[test]
fn missing_config_is_reported() {
    let dir = TempDir::new().expect("tmp");

    marklist_cmd(&dir.path().join("absent.yaml"))
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("failed to load config"));
}

#[test]
fn diff_rejects_unconfigured_source() {
    let dir = TempDir::new().expect("tmp");
    let config = write_config(&dir);

    marklist_cmd(&config)
        .args(["diff", "owner/ghost", "README.md"])
        .assert()
        .failure()
        .stderr(contains("not configured"));
}
