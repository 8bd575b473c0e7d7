//! Fetch gating and source freshness.
//!
//! The engine and `marklist status` share these rules:
//!
//! 1. A document with no FileMeta, or whose status is not `ok`, forces a
//!    rebuild of its source.
//! 2. A document checked less than `file_min_updated_hours` ago is skipped
//!    unless the run forces fetches.
//! 3. Otherwise the document is due.

use chrono::{DateTime, Duration, Utc};

use marklist_core::{FileMeta, FileStatus, RunOptions, SourceConfig, SourceMeta};

/// Per-document decision before any network access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentGate {
    Rebuild,
    SkipRecent { hours_since_checked: f64 },
    Due,
}

pub fn gate_document(
    meta: Option<&FileMeta>,
    now: DateTime<Utc>,
    min_updated_hours: f64,
    force_fetch: bool,
) -> DocumentGate {
    let Some(meta) = meta.filter(|m| m.is_usable()) else {
        return DocumentGate::Rebuild;
    };
    let hours_since_checked = hours_since(meta.checked_at, now);
    if !force_fetch && hours_since_checked < min_updated_hours {
        return DocumentGate::SkipRecent {
            hours_since_checked,
        };
    }
    DocumentGate::Due
}

/// Fractional hours between `then` and `now`.
pub fn hours_since(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    now.signed_duration_since(then).num_milliseconds() as f64 / 3_600_000.0
}

/// Initialization state of a configured source at the start of its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    NeverInitialized,
    PartiallyInitialized,
    Ready,
}

pub fn source_state(
    source: &SourceConfig,
    options: &RunOptions,
    meta: Option<&SourceMeta>,
) -> SourceState {
    let Some(meta) = meta else {
        return SourceState::NeverInitialized;
    };
    if options.is_specific() && options.rebuild {
        return SourceState::NeverInitialized;
    }
    if !meta.covers(source.files.iter()) {
        return SourceState::PartiallyInitialized;
    }
    SourceState::Ready
}

/// Freshness of one configured source, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFreshness {
    Disabled,
    NeverSynced,
    Partial { missing: Vec<String> },
    ParseFailed { files: Vec<String> },
    Due { files: Vec<String> },
    Fresh,
}

impl SourceFreshness {
    pub fn label(&self) -> &'static str {
        match self {
            SourceFreshness::Disabled => "disabled",
            SourceFreshness::NeverSynced => "never synced",
            SourceFreshness::Partial { .. } => "partial",
            SourceFreshness::ParseFailed { .. } => "parse failed",
            SourceFreshness::Due { .. } => "due",
            SourceFreshness::Fresh => "fresh",
        }
    }

    /// Documents the state refers to, empty for whole-source states.
    pub fn files(&self) -> &[String] {
        match self {
            SourceFreshness::Partial { missing } => missing,
            SourceFreshness::ParseFailed { files } | SourceFreshness::Due { files } => files,
            _ => &[],
        }
    }
}

/// Classify `source` against its persisted metadata.
///
/// Precedence: `Disabled`, `NeverSynced`, `Partial`, `ParseFailed`, `Due`,
/// `Fresh`.
pub fn classify(
    source: &SourceConfig,
    meta: Option<&SourceMeta>,
    min_updated_hours: f64,
    now: DateTime<Utc>,
) -> SourceFreshness {
    if source.skip {
        return SourceFreshness::Disabled;
    }
    let Some(meta) = meta else {
        return SourceFreshness::NeverSynced;
    };

    let missing: Vec<String> = source
        .files
        .iter()
        .filter(|path| !meta.files.contains_key(*path))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return SourceFreshness::Partial { missing };
    }

    let failed: Vec<String> = source
        .files
        .iter()
        .filter(|path| {
            meta.files
                .get(*path)
                .is_some_and(|m| m.status != FileStatus::Ok)
        })
        .cloned()
        .collect();
    if !failed.is_empty() {
        return SourceFreshness::ParseFailed { files: failed };
    }

    let due: Vec<String> = source
        .files
        .iter()
        .filter(|path| {
            matches!(
                gate_document(meta.files.get(*path), now, min_updated_hours, false),
                DocumentGate::Due
            )
        })
        .cloned()
        .collect();
    if !due.is_empty() {
        return SourceFreshness::Due { files: due };
    }

    SourceFreshness::Fresh
}

/// Compact age of `timestamp` relative to `now`, e.g. `5m`, `3h`, `2d`,
/// `6w`. Future timestamps read as `0s`.
pub fn format_datetime_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(timestamp).max(Duration::zero());
    if age.num_minutes() == 0 {
        format!("{}s", age.num_seconds())
    } else if age.num_hours() == 0 {
        format!("{}m", age.num_minutes())
    } else if age.num_days() == 0 {
        format!("{}h", age.num_hours())
    } else if age.num_weeks() < 2 {
        format!("{}d", age.num_days())
    } else {
        format!("{}w", age.num_weeks())
    }
}
