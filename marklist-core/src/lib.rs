//! marklist core library — domain types, configuration, fingerprints, errors.
//!
//! Public API surface:
//! - [`types`] — persisted records (`SourceMeta`, `FileMeta`, `Item`, …)
//! - [`config`] — YAML configuration and run options
//! - [`hash`] — content fingerprint
//! - [`bucket`] — day / week bucket identifiers
//! - [`error`] — [`ConfigError`]

pub mod bucket;
pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{Config, RunOptions, SourceConfig};
pub use error::ConfigError;
pub use types::{
    CachedRepo, CachedStars, DbMeta, FileMeta, FileRef, FileStatus, IndexEntry, InvalidFileReport,
    Item, ItemIndex, ItemMap, RepoMeta, RepoMetaOverride, SourceMeta,
};
