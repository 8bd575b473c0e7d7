//! YAML configuration and per-run options.
//!
//! # File layout
//!
//! ```yaml
//! data_dir: db                 # relative to the config file's directory
//! file_min_updated_hours: 24
//! invalid_item_threshold: 10
//! sources:
//!   - identifier: sindresorhus/awesome
//!     files: [readme.md]
//!     default_branch: main
//!     skip: false
//! ```
//!
//! Source order in the file is the order in which a full run visits them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{io_err, ConfigError};
use crate::types::RepoMetaOverride;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "marklist.yaml";

const DEFAULT_DATA_DIR: &str = "db";
const DEFAULT_MIN_UPDATED_HOURS: f64 = 24.0;
const DEFAULT_INVALID_ITEM_THRESHOLD: usize = 10;

/// One configured remote origin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    /// GitHub `owner/repo`.
    pub identifier: String,
    /// Tracked document paths, in processing order.
    pub files: Vec<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub skip: bool,
}

impl SourceConfig {
    pub fn overrides(&self) -> RepoMetaOverride {
        RepoMetaOverride {
            default_branch: self.default_branch.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default = "default_min_updated_hours")]
    file_min_updated_hours: f64,
    #[serde(default = "default_invalid_item_threshold")]
    invalid_item_threshold: usize,
    #[serde(default)]
    sources: Vec<SourceConfig>,
}

fn default_min_updated_hours() -> f64 {
    DEFAULT_MIN_UPDATED_HOURS
}

fn default_invalid_item_threshold() -> usize {
    DEFAULT_INVALID_ITEM_THRESHOLD
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Absolute (or config-relative resolved) database directory.
    pub data_dir: PathBuf,
    /// Documents checked more recently than this are not fetched.
    pub file_min_updated_hours: f64,
    /// Documents yielding fewer items than this are reported for review.
    pub invalid_item_threshold: usize,
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load and validate the config at `path`.
    ///
    /// A relative `data_dir` is resolved against the config file's directory.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let raw: RawConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_raw(raw, base)
    }

    /// Parse config from a YAML string, resolving `data_dir` against `base`.
    pub fn from_yaml(yaml: &str, base: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source: e,
        })?;
        Self::from_raw(raw, base)
    }

    fn from_raw(raw: RawConfig, base: &Path) -> Result<Self, ConfigError> {
        if !raw.file_min_updated_hours.is_finite() || raw.file_min_updated_hours < 0.0 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "file_min_updated_hours must be a non-negative number, got {}",
                    raw.file_min_updated_hours
                ),
            });
        }

        let mut seen = HashSet::new();
        for source in &raw.sources {
            if !seen.insert(source.identifier.as_str()) {
                return Err(ConfigError::DuplicateSource {
                    identifier: source.identifier.clone(),
                });
            }
            if source.files.is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("source '{}' lists no files", source.identifier),
                });
            }
        }

        let data_dir = raw
            .data_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let data_dir = if data_dir.is_absolute() {
            data_dir
        } else {
            base.join(data_dir)
        };

        Ok(Self {
            data_dir,
            file_min_updated_hours: raw.file_min_updated_hours,
            invalid_item_threshold: raw.invalid_item_threshold,
            sources: raw.sources,
        })
    }

    /// Look up a source by identifier.
    pub fn source(&self, identifier: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.identifier == identifier)
    }
}

/// Options for a single sync run, supplied by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Explicit sources to process; empty means every configured source.
    pub sources: Vec<String>,
    /// Fetch and re-merge even when recently checked or unchanged.
    pub force_fetch: bool,
    /// Combined with explicit `sources`, forces a full re-ingest.
    pub rebuild: bool,
    /// Process at most this many sources (after selection).
    pub limit: Option<usize>,
}

impl RunOptions {
    /// `true` when the caller named sources explicitly.
    pub fn is_specific(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Source identifiers to visit, in order, with `limit` applied.
    pub fn selected(&self, config: &Config) -> Vec<String> {
        let mut ids: Vec<String> = if self.is_specific() {
            self.sources.clone()
        } else {
            config.sources.iter().map(|s| s.identifier.clone()).collect()
        };
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            ids.truncate(limit);
        }
        ids
    }
}
