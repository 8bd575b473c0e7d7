//! Markdown list extraction for `marklist-parser`.
//!
//! [`DocumentParser::parse`] turns a raw document body into an ordered list of
//! [`DocItem`]s. The raw form of every item is kept byte-for-byte (minus line
//! terminators) because it is what the sync engine fingerprints; the
//! formatted form is presentation only.

mod list;

use std::str::Utf8Error;

use thiserror::Error;

use marklist_core::{CachedStars, FileRef};

pub use list::ListParser;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A candidate item as produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocItem {
    /// Exact source lines of the item. Identity is derived from this.
    pub raw_markdown: String,
    /// Normalized single-line markdown used for rendering.
    pub formatted_markdown: String,
    /// Text of the closest preceding heading, empty before the first one.
    pub category: String,
}

/// Where a document lives, for resolving relative links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    pub file: FileRef,
    /// Branch used for absolute links; `HEAD` when unknown.
    pub default_branch: Option<String>,
}

impl FileContext {
    pub fn new(file: FileRef, default_branch: Option<String>) -> Self {
        Self {
            file,
            default_branch,
        }
    }
}

/// Errors from document parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{file} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        file: String,
        #[source]
        source: Utf8Error,
    },
}

/// Splits a document body into candidate items.
pub trait DocumentParser {
    fn parse(
        &self,
        body: &[u8],
        context: &FileContext,
        stars: &CachedStars,
    ) -> Result<Vec<DocItem>, ParseError>;
}
