//! Remote-vs-stored unified diff support for `marklist diff`.

use similar::TextDiff;

use marklist_core::hash::fingerprint;
use marklist_core::{FileRef, SourceConfig};

use crate::fetch::ContentFetcher;
use crate::store::JsonDb;
use crate::SyncError;

/// Difference between the stored and the current remote body of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDiff {
    pub file: FileRef,
    /// Empty when both bodies are identical.
    pub unified_diff: String,
    pub remote_fingerprint: String,
    /// `None` when the document was never stored.
    pub stored_fingerprint: Option<String>,
}

impl DocumentDiff {
    pub fn is_unchanged(&self) -> bool {
        self.stored_fingerprint.as_deref() == Some(self.remote_fingerprint.as_str())
    }
}

/// Fetch `path` and compare it with the body stored by the last sync.
///
/// No files are written.
pub fn diff_document(
    fetcher: &dyn ContentFetcher,
    db: &JsonDb,
    source: &SourceConfig,
    path: &str,
    branch: Option<&str>,
) -> Result<DocumentDiff, SyncError> {
    let file = FileRef::new(source.identifier.as_str(), path);
    let remote = fetcher.fetch_body(source, path, branch)?;
    let stored = db.read_file(&file)?;

    let remote_fingerprint = fingerprint(&remote);
    let stored_fingerprint = stored.as_ref().map(fingerprint);

    let old = normalize_line_endings(&String::from_utf8_lossy(
        stored.as_deref().unwrap_or_default(),
    ));
    let new = normalize_line_endings(&String::from_utf8_lossy(&remote));
    let unified_diff = if old == new {
        String::new()
    } else {
        let old_header = format!("a/{file}");
        let new_header = format!("b/{file}");
        TextDiff::from_lines(&old, &new)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string()
    };

    Ok(DocumentDiff {
        file,
        unified_diff,
        remote_fingerprint,
        stored_fingerprint,
    })
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
