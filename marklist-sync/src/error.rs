//! Error types for marklist-sync.

use std::path::PathBuf;

use thiserror::Error;

use marklist_core::ConfigError;
use marklist_parser::ParseError;

/// Failures talking to the remote content host.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u16 },

    /// DNS, TLS, connection or timeout failure.
    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response arrived but its body could not be read or decoded.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{identifier}' is not an owner/repo identifier")]
    InvalidIdentifier { identifier: String },

    /// A configured base URL cannot carry a path.
    #[error("'{url}' is not a usable base URL")]
    InvalidBaseUrl { url: String },
}

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error in the store.
    #[error("store JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document was never stored, so it has no item map.
    #[error("no stored items for {source_identifier}/{file}")]
    ItemsNotFound {
        source_identifier: String,
        file: String,
    },

    /// A source identifier or document path would escape the data directory.
    #[error("refusing to store outside the data directory: {path}")]
    InvalidPath { path: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Json`].
pub(crate) fn json_err(path: impl Into<PathBuf>, source: serde_json::Error) -> SyncError {
    SyncError::Json {
        path: path.into(),
        source,
    }
}
