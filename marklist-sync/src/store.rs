//! Item store and checkpoint persistence.
//!
//! [`JsonDb`] lays the database out under a single root directory:
//!
//! ```text
//! <root>/
//!   meta.json                        checkpoint: DbMeta
//!   index.json                       checkpoint: ItemIndex
//!   stars.json                       checkpoint: CachedStars
//!   invalid-files.json               side file, written only when non-empty
//!   items/<owner>/<repo>/<file>.json ItemMap per document
//!   files/<owner>/<repo>/<file>.body last fetched body per document
//! ```
//!
//! Per-document files carry a suffix so that a document named `docs` and one
//! under `docs/` never need the same path as both file and directory.
//!
//! Every write goes to a `.tmp` sibling and is renamed into place.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use marklist_core::{CachedStars, DbMeta, FileRef, InvalidFileReport, ItemIndex, ItemMap};

use crate::error::{io_err, json_err, SyncError};

const META_FILE: &str = "meta.json";
const INDEX_FILE: &str = "index.json";
const STARS_FILE: &str = "stars.json";
const INVALID_FILES_FILE: &str = "invalid-files.json";

/// Per-document item persistence.
pub trait ItemStore {
    /// Stored items for `file`. Fails with [`SyncError::ItemsNotFound`] if the
    /// document was never stored.
    fn get_items(&self, file: &FileRef) -> Result<ItemMap, SyncError>;

    /// Replace the stored body of `file`.
    fn update_file(&self, file: &FileRef, body: &[u8]) -> Result<(), SyncError>;

    /// Replace the item map of `file` and re-point its index entries.
    fn update_items(
        &self,
        file: &FileRef,
        items: &ItemMap,
        index: &mut ItemIndex,
    ) -> Result<(), SyncError>;
}

/// Whole-structure load/save of the run's working state.
///
/// Missing structures load as empty defaults.
pub trait Checkpoint {
    fn read_meta(&self) -> Result<DbMeta, SyncError>;
    fn write_meta(&self, meta: &DbMeta) -> Result<(), SyncError>;
    fn read_index(&self) -> Result<ItemIndex, SyncError>;
    fn write_index(&self, index: &ItemIndex) -> Result<(), SyncError>;
    fn read_stars(&self) -> Result<CachedStars, SyncError>;
    fn write_stars(&self, stars: &CachedStars) -> Result<(), SyncError>;
    /// Side file for manual follow-up of suspicious documents.
    fn write_invalid_files(&self, reports: &[InvalidFileReport]) -> Result<(), SyncError>;
}

/// File-system database rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonDb {
    root: PathBuf,
}

impl JsonDb {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/items/<source>/<file>.json`
    pub fn items_path(&self, file: &FileRef) -> Result<PathBuf, SyncError> {
        Ok(with_suffix(&self.document_path("items", file)?, ".json"))
    }

    /// `<root>/files/<source>/<file>.body`
    pub fn body_path(&self, file: &FileRef) -> Result<PathBuf, SyncError> {
        Ok(with_suffix(&self.document_path("files", file)?, ".body"))
    }

    pub fn invalid_files_path(&self) -> PathBuf {
        self.root.join(INVALID_FILES_FILE)
    }

    /// Last stored body of `file`, or `None` if it was never stored.
    pub fn read_file(&self, file: &FileRef) -> Result<Option<Vec<u8>>, SyncError> {
        let path = self.body_path(file)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(path, err)),
        }
    }

    fn document_path(&self, area: &str, file: &FileRef) -> Result<PathBuf, SyncError> {
        let mut path = self.root.join(area);
        push_relative(&mut path, &file.source_identifier)?;
        push_relative(&mut path, &file.file)?;
        Ok(path)
    }

    fn read_json_or_default<T: DeserializeOwned + Default>(
        &self,
        name: &str,
    ) -> Result<T, SyncError> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| json_err(&path, e)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(err) => Err(io_err(path, err)),
        }
    }
}

impl ItemStore for JsonDb {
    fn get_items(&self, file: &FileRef) -> Result<ItemMap, SyncError> {
        let path = self.items_path(file)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(SyncError::ItemsNotFound {
                    source_identifier: file.source_identifier.clone(),
                    file: file.file.clone(),
                });
            }
            Err(err) => return Err(io_err(path, err)),
        };
        serde_json::from_str(&contents).map_err(|e| json_err(&path, e))
    }

    fn update_file(&self, file: &FileRef, body: &[u8]) -> Result<(), SyncError> {
        let path = self.body_path(file)?;
        atomic_write(&path, body)
    }

    fn update_items(
        &self,
        file: &FileRef,
        items: &ItemMap,
        index: &mut ItemIndex,
    ) -> Result<(), SyncError> {
        let path = self.items_path(file)?;
        write_json(&path, items)?;
        index.replace_file(file, items);
        Ok(())
    }
}

impl Checkpoint for JsonDb {
    fn read_meta(&self) -> Result<DbMeta, SyncError> {
        let mut meta: DbMeta = self.read_json_or_default(META_FILE)?;
        meta.normalize_legacy();
        Ok(meta)
    }

    fn write_meta(&self, meta: &DbMeta) -> Result<(), SyncError> {
        write_json(&self.root.join(META_FILE), meta)
    }

    fn read_index(&self) -> Result<ItemIndex, SyncError> {
        self.read_json_or_default(INDEX_FILE)
    }

    fn write_index(&self, index: &ItemIndex) -> Result<(), SyncError> {
        write_json(&self.root.join(INDEX_FILE), index)
    }

    fn read_stars(&self) -> Result<CachedStars, SyncError> {
        self.read_json_or_default(STARS_FILE)
    }

    fn write_stars(&self, stars: &CachedStars) -> Result<(), SyncError> {
        write_json(&self.root.join(STARS_FILE), stars)
    }

    fn write_invalid_files(&self, reports: &[InvalidFileReport]) -> Result<(), SyncError> {
        write_json(&self.invalid_files_path(), &reports)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append `relative` to `base`, allowing only plain path segments.
fn push_relative(base: &mut PathBuf, relative: &str) -> Result<(), SyncError> {
    let invalid = || SyncError::InvalidPath {
        path: relative.to_string(),
    };
    let mut pushed = false;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => {
                base.push(segment);
                pushed = true;
            }
            Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }
    if pushed {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SyncError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| json_err(path, e))?;
    atomic_write(path, json.as_bytes())
}

/// Write to `<path>.tmp`, then rename over `path`.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("path has no parent")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let tmp = with_suffix(path, ".tmp");
    std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// `path` with `suffix` appended to its file name (`a.md` → `a.md.json`).
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
