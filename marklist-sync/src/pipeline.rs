//! Production wiring used by the CLI.

use chrono::{DateTime, Utc};

use marklist_core::{Config, RunOptions, SourceMeta};
use marklist_parser::ListParser;
use marklist_renderer::CmarkRenderer;

use crate::clock::{Clock, SystemClock};
use crate::context::SyncEnv;
use crate::diff::{diff_document, DocumentDiff};
use crate::engine::{RunReport, SyncEngine};
use crate::fetch::GitHubFetcher;
use crate::freshness::{classify, SourceFreshness};
use crate::init::FullIngest;
use crate::store::{Checkpoint, JsonDb};
use crate::SyncError;

/// Run the engine against GitHub and the JSON database in `config.data_dir`.
pub fn run(config: &Config, options: &RunOptions) -> Result<RunReport, SyncError> {
    let fetcher = GitHubFetcher::from_env();
    let renderer = CmarkRenderer::new();
    let db = JsonDb::new(&config.data_dir);
    let env = SyncEnv {
        fetcher: &fetcher,
        parser: &ListParser,
        renderer: &renderer,
        store: &db,
        clock: &SystemClock,
    };
    SyncEngine::new(config, env, &db, &FullIngest).run(options)
}

/// Diff one configured document against GitHub.
pub fn diff(config: &Config, identifier: &str, path: &str) -> Result<DocumentDiff, SyncError> {
    let source = config.source(identifier).ok_or_else(|| {
        SyncError::Config(marklist_core::ConfigError::Invalid {
            message: format!("source '{identifier}' is not configured"),
        })
    })?;
    let db = JsonDb::new(&config.data_dir);
    let meta = db.read_meta()?;
    let branch = source.default_branch.clone().or_else(|| {
        meta.sources
            .get(identifier)
            .and_then(|m| m.meta.default_branch.clone())
    });
    diff_document(
        &GitHubFetcher::from_env(),
        &db,
        source,
        path,
        branch.as_deref(),
    )
}

/// Freshness of one configured source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub identifier: String,
    pub freshness: SourceFreshness,
    pub updated_at: Option<DateTime<Utc>>,
    pub stars: Option<u64>,
    pub item_count: usize,
}

/// Classify every configured source against the stored metadata.
pub fn status(config: &Config) -> Result<Vec<SourceStatus>, SyncError> {
    status_at(config, SystemClock.now())
}

pub fn status_at(config: &Config, now: DateTime<Utc>) -> Result<Vec<SourceStatus>, SyncError> {
    let db = JsonDb::new(&config.data_dir);
    let meta = db.read_meta()?;
    let index = db.read_index()?;
    Ok(config
        .sources
        .iter()
        .map(|source| {
            let stored: Option<&SourceMeta> = meta.sources.get(&source.identifier);
            SourceStatus {
                identifier: source.identifier.clone(),
                freshness: classify(source, stored, config.file_min_updated_hours, now),
                updated_at: stored.map(|m| m.updated_at),
                stars: stored.map(|m| m.meta.stars),
                item_count: index.count_for_source(&source.identifier),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn status_without_database_reports_never_synced() {
        let tmp = TempDir::new().expect("tmp");
        let yaml = "sources:\n  - identifier: a/b\n    files: [README.md]\n  - identifier: c/d\n    files: [README.md]\n    skip: true\n";
        let config = Config::from_yaml(yaml, tmp.path()).expect("config");
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let statuses = status_at(&config, now).expect("status");
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].freshness, SourceFreshness::NeverSynced);
        assert_eq!(statuses[0].item_count, 0);
        assert_eq!(statuses[1].freshness, SourceFreshness::Disabled);
    }

    #[test]
    fn diff_of_unconfigured_source_is_config_error() {
        let config = Config::from_yaml("sources: []\n", Path::new("/tmp")).expect("config");
        let err = diff(&config, "x/y", "README.md").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)), "got: {err}");
    }
}
