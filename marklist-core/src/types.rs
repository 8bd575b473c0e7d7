//! Persisted domain records.
//!
//! All timestamps are `DateTime<Utc>` and serialize as RFC 3339 strings.
//! All types round-trip through serde_json, which is the on-disk encoding
//! used by the sync store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// File status
// ---------------------------------------------------------------------------

/// Outcome of the most recent parse of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Parsed into at least one item.
    Ok,
    /// The parser failed or found nothing; the document must be rebuilt.
    ParseFailed,
    /// Record predates status tracking.
    #[default]
    Unset,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Ok => write!(f, "ok"),
            FileStatus::ParseFailed => write!(f, "parse_failed"),
            FileStatus::Unset => write!(f, "unset"),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Per-document sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Fingerprint of the last fetched body.
    pub fingerprint: String,
    /// Most recent item change detected within the document.
    pub updated_at: DateTime<Utc>,
    /// Last fetch attempt, whether or not anything changed.
    pub checked_at: DateTime<Utc>,
    #[serde(default)]
    pub status: FileStatus,
}

impl FileMeta {
    /// `true` when the document can be updated incrementally.
    pub fn is_usable(&self) -> bool {
        self.status == FileStatus::Ok
    }

    /// Resolve `Unset` on records written before `status` existed: those used
    /// an epoch-zero `updated_at` to flag a failed parse.
    pub fn normalize_legacy(&mut self) {
        if self.status != FileStatus::Unset {
            return;
        }
        self.status = if self.updated_at.timestamp() == 0 {
            FileStatus::ParseFailed
        } else {
            FileStatus::Ok
        };
    }
}

/// Repository metadata snapshot for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RepoMeta {
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

impl RepoMeta {
    /// Overlay configured overrides on top of fetched values.
    pub fn with_overrides(mut self, overrides: &RepoMetaOverride) -> Self {
        if let Some(branch) = &overrides.default_branch {
            self.default_branch = Some(branch.clone());
        }
        self
    }
}

/// Configured values that win over fetched repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepoMetaOverride {
    pub default_branch: Option<String>,
}

/// Persisted state for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    #[serde(default)]
    pub files: BTreeMap<String, FileMeta>,
    #[serde(default)]
    pub meta: RepoMeta,
    pub updated_at: DateTime<Utc>,
}

impl SourceMeta {
    /// `true` when every path in `paths` has a FileMeta entry.
    pub fn covers<'a>(&self, mut paths: impl Iterator<Item = &'a String>) -> bool {
        paths.all(|path| self.files.contains_key(path))
    }
}

/// Root metadata document: every known source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DbMeta {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceMeta>,
}

impl DbMeta {
    /// Apply [`FileMeta::normalize_legacy`] to every document.
    pub fn normalize_legacy(&mut self) {
        for source in self.sources.values_mut() {
            for file in source.files.values_mut() {
                file.normalize_legacy();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A (source, document) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileRef {
    pub source_identifier: String,
    pub file: String,
}

impl FileRef {
    pub fn new(source_identifier: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            source_identifier: source_identifier.into(),
            file: file.into(),
        }
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_identifier, self.file)
    }
}

/// A single list entry extracted from a document.
///
/// `fingerprint` is the hash of the raw item text; every other content field
/// is presentation and may be refreshed without changing identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub source_identifier: String,
    pub file: String,
    pub fingerprint: String,
    pub markdown: String,
    pub html: String,
    pub category: String,
    pub category_html: String,
    pub updated_at: DateTime<Utc>,
    pub checked_at: DateTime<Utc>,
    pub updated_day: u32,
    pub updated_week: u32,
}

/// Fingerprint → item, for one document.
pub type ItemMap = BTreeMap<String, Item>;

/// Global index entry for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub source_identifier: String,
    pub file: String,
    pub updated_at: DateTime<Utc>,
    pub updated_day: u32,
    pub updated_week: u32,
}

impl From<&Item> for IndexEntry {
    fn from(item: &Item) -> Self {
        Self {
            source_identifier: item.source_identifier.clone(),
            file: item.file.clone(),
            updated_at: item.updated_at,
            updated_day: item.updated_day,
            updated_week: item.updated_week,
        }
    }
}

/// Global fingerprint → location index across every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ItemIndex {
    #[serde(default)]
    pub items: BTreeMap<String, IndexEntry>,
}

impl ItemIndex {
    /// Replace every entry of `file` with the entries of `items`.
    pub fn replace_file(&mut self, file: &FileRef, items: &ItemMap) {
        self.items.retain(|_, entry| {
            entry.source_identifier != file.source_identifier || entry.file != file.file
        });
        for (fingerprint, item) in items {
            self.items.insert(fingerprint.clone(), IndexEntry::from(item));
        }
    }

    /// Number of indexed items belonging to `source_identifier`.
    pub fn count_for_source(&self, source_identifier: &str) -> usize {
        self.items
            .values()
            .filter(|entry| entry.source_identifier == source_identifier)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Star cache
// ---------------------------------------------------------------------------

/// Cached repository metadata, keyed by `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRepo {
    pub stars: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl CachedRepo {
    pub fn from_meta(meta: &RepoMeta, checked_at: DateTime<Utc>) -> Self {
        Self {
            stars: meta.stars,
            description: meta.description.clone(),
            default_branch: meta.default_branch.clone(),
            checked_at,
        }
    }
}

/// Process-wide star cache. Keys are lowercase `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CachedStars {
    #[serde(default)]
    pub repos: BTreeMap<String, CachedRepo>,
}

impl CachedStars {
    pub fn get(&self, repo: &str) -> Option<&CachedRepo> {
        self.repos.get(&repo.to_ascii_lowercase())
    }

    pub fn insert(&mut self, repo: &str, entry: CachedRepo) {
        self.repos.insert(repo.to_ascii_lowercase(), entry);
    }

    /// Cached entry for `repo` checked no earlier than `since`.
    pub fn fresh_since(&self, repo: &str, since: DateTime<Utc>) -> Option<&CachedRepo> {
        self.get(repo).filter(|entry| entry.checked_at >= since)
    }
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

/// A document whose parse produced implausibly few items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidFileReport {
    pub source_identifier: String,
    pub file: String,
}

impl From<&FileRef> for InvalidFileReport {
    fn from(file: &FileRef) -> Self {
        Self {
            source_identifier: file.source_identifier.clone(),
            file: file.file.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn item(source: &str, file: &str, fingerprint: &str) -> Item {
        Item {
            source_identifier: source.into(),
            file: file.into(),
            fingerprint: fingerprint.into(),
            markdown: String::new(),
            html: String::new(),
            category: String::new(),
            category_html: String::new(),
            updated_at: at(1),
            checked_at: at(1),
            updated_day: 20240501,
            updated_week: 202418,
        }
    }

    #[test]
    fn legacy_file_meta_without_status_is_normalized() {
        let json = r#"{"fingerprint":"aa","updated_at":"1970-01-01T00:00:00Z","checked_at":"2024-05-01T00:00:00Z"}"#;
        let mut failed: FileMeta = serde_json::from_str(json).expect("parse");
        assert_eq!(failed.status, FileStatus::Unset);
        failed.normalize_legacy();
        assert_eq!(failed.status, FileStatus::ParseFailed);

        let json = r#"{"fingerprint":"aa","updated_at":"2024-04-01T00:00:00Z","checked_at":"2024-05-01T00:00:00Z"}"#;
        let mut ok: FileMeta = serde_json::from_str(json).expect("parse");
        ok.normalize_legacy();
        assert_eq!(ok.status, FileStatus::Ok);
        assert!(ok.is_usable());
    }

    #[test]
    fn explicit_status_survives_normalization() {
        let mut meta = FileMeta {
            fingerprint: "aa".into(),
            updated_at: DateTime::UNIX_EPOCH,
            checked_at: at(2),
            status: FileStatus::Ok,
        };
        meta.normalize_legacy();
        assert_eq!(meta.status, FileStatus::Ok);
    }

    #[test]
    fn source_meta_covers_only_when_all_paths_present() {
        let mut files = BTreeMap::new();
        files.insert(
            "README.md".to_string(),
            FileMeta {
                fingerprint: "aa".into(),
                updated_at: at(1),
                checked_at: at(1),
                status: FileStatus::Ok,
            },
        );
        let meta = SourceMeta {
            files,
            meta: RepoMeta::default(),
            updated_at: at(1),
        };
        let configured = vec!["README.md".to_string()];
        assert!(meta.covers(configured.iter()));
        let configured = vec!["README.md".to_string(), "docs/extra.md".to_string()];
        assert!(!meta.covers(configured.iter()));
    }

    #[test]
    fn index_replace_file_drops_stale_entries_of_that_file_only() {
        let mut index = ItemIndex::default();
        let readme = FileRef::new("a/b", "README.md");
        let other = FileRef::new("a/b", "OTHER.md");

        let mut first = ItemMap::new();
        first.insert("f1".into(), item("a/b", "README.md", "f1"));
        first.insert("f2".into(), item("a/b", "README.md", "f2"));
        index.replace_file(&readme, &first);

        let mut other_items = ItemMap::new();
        other_items.insert("o1".into(), item("a/b", "OTHER.md", "o1"));
        index.replace_file(&other, &other_items);

        let mut second = ItemMap::new();
        second.insert("f2".into(), item("a/b", "README.md", "f2"));
        second.insert("f3".into(), item("a/b", "README.md", "f3"));
        index.replace_file(&readme, &second);

        let keys: Vec<_> = index.items.keys().cloned().collect();
        assert_eq!(keys, vec!["f2", "f3", "o1"]);
        assert_eq!(index.count_for_source("a/b"), 3);
        assert_eq!(index.count_for_source("x/y"), 0);
    }

    #[test]
    fn star_cache_keys_are_case_insensitive() {
        let mut stars = CachedStars::default();
        stars.insert(
            "Rust-Lang/Rust",
            CachedRepo {
                stars: 10,
                description: None,
                default_branch: None,
                checked_at: at(3),
            },
        );
        assert_eq!(stars.get("rust-lang/rust").map(|r| r.stars), Some(10));
        assert!(stars.fresh_since("rust-lang/rust", at(3)).is_some());
        assert!(stars.fresh_since("rust-lang/rust", at(4)).is_none());
    }

    #[test]
    fn overrides_win_over_fetched_branch() {
        let fetched = RepoMeta {
            default_branch: Some("master".into()),
            stars: 3,
            ..RepoMeta::default()
        };
        let merged = fetched.clone().with_overrides(&RepoMetaOverride {
            default_branch: Some("main".into()),
        });
        assert_eq!(merged.default_branch.as_deref(), Some("main"));
        assert_eq!(merged.stars, 3);

        let untouched = fetched.clone().with_overrides(&RepoMetaOverride::default());
        assert_eq!(untouched, fetched);
    }
}
