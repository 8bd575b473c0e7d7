//! Run-scoped working state and collaborators.

use chrono::{DateTime, Utc};
use tracing::warn;

use marklist_core::{
    CachedRepo, CachedStars, DbMeta, FileRef, InvalidFileReport, ItemIndex, RepoMeta,
    SourceConfig,
};
use marklist_parser::DocumentParser;
use marklist_renderer::MarkdownRender;

use crate::clock::Clock;
use crate::fetch::ContentFetcher;
use crate::store::{Checkpoint, ItemStore};
use crate::SyncError;

/// Collaborators a run needs, borrowed for its duration.
#[derive(Clone, Copy)]
pub struct SyncEnv<'a> {
    pub fetcher: &'a dyn ContentFetcher,
    pub parser: &'a dyn DocumentParser,
    pub renderer: &'a dyn MarkdownRender,
    pub store: &'a dyn ItemStore,
    pub clock: &'a dyn Clock,
}

/// In-memory copies of the checkpointed structures, owned by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncContext {
    pub meta: DbMeta,
    pub index: ItemIndex,
    pub stars: CachedStars,
    pub invalid_files: Vec<InvalidFileReport>,
    /// Star cache entries checked at or after this instant are reused.
    pub run_started_at: DateTime<Utc>,
}

impl SyncContext {
    pub fn load(
        checkpoint: &dyn Checkpoint,
        run_started_at: DateTime<Utc>,
    ) -> Result<Self, SyncError> {
        Ok(Self {
            meta: checkpoint.read_meta()?,
            index: checkpoint.read_index()?,
            stars: checkpoint.read_stars()?,
            invalid_files: Vec::new(),
            run_started_at,
        })
    }

    /// Write metadata, index and star cache.
    pub fn save(&self, checkpoint: &dyn Checkpoint) -> Result<(), SyncError> {
        checkpoint.write_meta(&self.meta)?;
        checkpoint.write_index(&self.index)?;
        checkpoint.write_stars(&self.stars)?;
        Ok(())
    }

    /// Report `file` when it yielded fewer than `threshold` items.
    pub fn check_item_count(&mut self, file: &FileRef, total_count: usize, threshold: usize) {
        if total_count >= threshold {
            return;
        }
        warn!(
            source = %file.source_identifier,
            file = %file.file,
            items = total_count,
            threshold,
            "too few items, reporting file"
        );
        let report = InvalidFileReport::from(file);
        if !self.invalid_files.contains(&report) {
            self.invalid_files.push(report);
        }
    }
}

/// Repository metadata for `source`, reusing a star cache entry refreshed
/// during this run. Fetched metadata is written back to the cache.
pub(crate) fn resolve_repo_meta(
    env: &SyncEnv<'_>,
    source: &SourceConfig,
    ctx: &mut SyncContext,
) -> Result<RepoMeta, SyncError> {
    let overrides = source.overrides();
    if let Some(cached) = ctx.stars.fresh_since(&source.identifier, ctx.run_started_at) {
        let mut meta = ctx
            .meta
            .sources
            .get(&source.identifier)
            .map(|m| m.meta.clone())
            .unwrap_or_default();
        meta.stars = cached.stars;
        meta.description = cached.description.clone();
        meta.default_branch = cached.default_branch.clone();
        return Ok(meta.with_overrides(&overrides));
    }

    let meta = env.fetcher.fetch_repo_meta(source, &overrides)?;
    ctx.stars
        .insert(&source.identifier, CachedRepo::from_meta(&meta, env.clock.now()));
    Ok(meta)
}
