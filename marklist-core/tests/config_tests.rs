//! Config loading: error messages and validation.

use assert_fs::prelude::*;
use marklist_core::{Config, ConfigError};
use predicates::prelude::predicate;
use rstest::rstest;

#[test]
fn load_missing_file_returns_io_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("marklist.yaml");
    let err = Config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("marklist.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("marklist.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = Config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("marklist.yaml"));
}

#[test]
fn load_resolves_data_dir_next_to_config() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("marklist.yaml");
    file.write_str("sources:\n  - identifier: a/b\n    files: [README.md]\n")
        .expect("write");

    let config = Config::load_at(file.path()).expect("load");
    assert_eq!(config.data_dir, dir.path().join("db"));
    file.assert(predicate::path::exists());
}

#[test]
fn duplicate_source_is_rejected() {
    let yaml = r#"
sources:
  - identifier: a/b
    files: [README.md]
  - identifier: a/b
    files: [OTHER.md]
"#;
    let err = Config::from_yaml(yaml, std::path::Path::new("/")).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateSource { ref identifier } if identifier == "a/b"));
}

#[rstest]
#[case("file_min_updated_hours: -1\nsources: []\n", "non-negative")]
#[case("file_min_updated_hours: .nan\nsources: []\n", "non-negative")]
#[case("sources:\n  - identifier: a/b\n    files: []\n", "lists no files")]
fn invalid_values_are_reported(#[case] yaml: &str, #[case] needle: &str) {
    let err = Config::from_yaml(yaml, std::path::Path::new("/")).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
    assert!(err.to_string().contains(needle), "got: {err}");
}
