//! # marklist-sync
//!
//! Incremental synchronization of remote markdown lists into a local item
//! database.
//!
//! [`SyncEngine::run`] is the entrypoint. It is assembled from pluggable
//! collaborators ([`ContentFetcher`], [`marklist_parser::DocumentParser`],
//! [`marklist_renderer::MarkdownRender`], [`ItemStore`], [`Checkpoint`],
//! [`Clock`]); [`pipeline::run`] wires the production set.

pub mod clock;
pub mod context;
pub mod diff;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod freshness;
pub mod init;
pub mod merge;
pub mod pipeline;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use context::{SyncContext, SyncEnv};
pub use diff::{diff_document, DocumentDiff};
pub use engine::{
    DocumentAction, DocumentReport, DocumentStep, RunReport, SkipReason, SourceOutcome,
    SourceReport, SyncEngine,
};
pub use error::{FetchError, SyncError};
pub use fetch::{ContentFetcher, GitHubFetcher};
pub use freshness::SourceFreshness;
pub use init::{FullIngest, SourceInitializer};
pub use merge::{merge_items, MergeOutcome};
pub use store::{Checkpoint, ItemStore, JsonDb};
