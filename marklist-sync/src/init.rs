//! Full ingest of a source, bypassing incremental diffing.

use std::collections::BTreeMap;

use tracing::{info, warn};

use marklist_core::hash::fingerprint;
use marklist_core::{Config, FileMeta, FileRef, FileStatus, ItemMap, SourceConfig, SourceMeta};
use marklist_parser::FileContext;

use crate::context::{resolve_repo_meta, SyncContext, SyncEnv};
use crate::merge::merge_items;
use crate::SyncError;

/// Builds a source's metadata and item maps from scratch.
pub trait SourceInitializer {
    fn init_source(
        &self,
        env: &SyncEnv<'_>,
        config: &Config,
        source: &SourceConfig,
        ctx: &mut SyncContext,
    ) -> Result<(), SyncError>;
}

/// Fetches and parses every configured document, treating every item as new.
///
/// Documents that fail to parse, or parse to nothing, are recorded as
/// `parse_failed` so the next run retries them, and are reported as invalid.
/// Fetch and store errors propagate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullIngest;

impl SourceInitializer for FullIngest {
    fn init_source(
        &self,
        env: &SyncEnv<'_>,
        config: &Config,
        source: &SourceConfig,
        ctx: &mut SyncContext,
    ) -> Result<(), SyncError> {
        let now = env.clock.now();
        let id = &source.identifier;
        info!(source = %id, files = source.files.len(), "initializing source");

        let repo = resolve_repo_meta(env, source, ctx)?;
        let branch = repo.default_branch.clone();

        let mut files = BTreeMap::new();
        for path in &source.files {
            let file = FileRef::new(id.as_str(), path.as_str());
            let body = env.fetcher.fetch_body(source, path, branch.as_deref())?;
            let body_fingerprint = fingerprint(&body);
            let failed = FileMeta {
                fingerprint: body_fingerprint.clone(),
                updated_at: now,
                checked_at: now,
                status: FileStatus::ParseFailed,
            };

            let context = FileContext::new(file.clone(), branch.clone());
            let doc_items = match env.parser.parse(&body, &context, &ctx.stars) {
                Ok(items) if !items.is_empty() => items,
                Ok(_) => {
                    warn!(source = %id, file = %path, "no items found");
                    files.insert(path.clone(), failed);
                    ctx.check_item_count(&file, 0, config.invalid_item_threshold);
                    continue;
                }
                Err(err) => {
                    warn!(source = %id, file = %path, error = %err, "parse failed");
                    files.insert(path.clone(), failed);
                    ctx.check_item_count(&file, 0, config.invalid_item_threshold);
                    continue;
                }
            };

            let outcome = merge_items(&file, doc_items, &ItemMap::new(), env.renderer, now);
            env.store.update_file(&file, &body)?;
            env.store.update_items(&file, &outcome.items, &mut ctx.index)?;
            files.insert(
                path.clone(),
                FileMeta {
                    fingerprint: body_fingerprint,
                    updated_at: outcome.updated_at.unwrap_or(now),
                    checked_at: now,
                    status: outcome.status(),
                },
            );
            ctx.check_item_count(&file, outcome.total_count, config.invalid_item_threshold);
            info!(source = %id, file = %path, items = outcome.items.len(), "ingested");
        }

        ctx.meta.sources.insert(
            id.clone(),
            SourceMeta {
                files,
                meta: repo,
                updated_at: now,
            },
        );
        Ok(())
    }
}
