//! Incremental sync engine.
//!
//! A run visits the selected sources in order. Each source is either skipped,
//! handed to the [`SourceInitializer`], or updated document by document. A
//! failing source is logged and stamped; the run carries on. The working
//! state is checkpointed once at the end of the run.

use serde::Serialize;
use tracing::{error, info, warn};

use marklist_core::hash::fingerprint;
use marklist_core::{Config, FileMeta, FileRef, InvalidFileReport, RunOptions, SourceConfig};
use marklist_parser::FileContext;

use crate::context::{resolve_repo_meta, SyncContext, SyncEnv};
use crate::freshness::{gate_document, source_state, DocumentGate, SourceState};
use crate::init::SourceInitializer;
use crate::merge::merge_items;
use crate::store::Checkpoint;
use crate::SyncError;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Unconfigured,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SourceOutcome {
    Skipped { reason: SkipReason },
    Initialized,
    Updated { documents: Vec<DocumentReport> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DocumentAction {
    SkippedRecent,
    Unchanged,
    Updated { new_count: usize, total_count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub file: String,
    #[serde(flatten)]
    pub action: DocumentAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub identifier: String,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

/// What a run did, source by source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub invalid_files: Vec<InvalidFileReport>,
}

impl RunReport {
    pub fn outcome(&self, identifier: &str) -> Option<&SourceOutcome> {
        self.sources
            .iter()
            .find(|s| s.identifier == identifier)
            .map(|s| &s.outcome)
    }

    pub fn failed_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Failed { .. }))
            .count()
    }
}

/// Result of evaluating one document of a ready source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStep {
    Continue(DocumentAction),
    /// The source must be rebuilt; its remaining documents are not visited.
    Reinit,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SyncEngine<'a> {
    config: &'a Config,
    env: SyncEnv<'a>,
    checkpoint: &'a dyn Checkpoint,
    initializer: &'a dyn SourceInitializer,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        config: &'a Config,
        env: SyncEnv<'a>,
        checkpoint: &'a dyn Checkpoint,
        initializer: &'a dyn SourceInitializer,
    ) -> Self {
        Self {
            config,
            env,
            checkpoint,
            initializer,
        }
    }

    /// Synchronize the sources selected by `options`.
    ///
    /// Per-source failures are reported in the [`RunReport`]; only loading or
    /// saving the checkpoint fails the run. When the final save fails it is
    /// attempted once more and the first error is returned.
    pub fn run(&self, options: &RunOptions) -> Result<RunReport, SyncError> {
        let mut ctx = SyncContext::load(self.checkpoint, self.env.clock.now())?;
        let selected = options.selected(self.config);
        let total = selected.len();
        let mut report = RunReport::default();

        for (position, identifier) in selected.iter().enumerate() {
            let outcome = self.run_source(position + 1, total, identifier, options, &mut ctx);
            report.sources.push(SourceReport {
                identifier: identifier.clone(),
                outcome,
            });
        }

        if let Err(err) = ctx.save(self.checkpoint) {
            error!(error = %err, "checkpoint failed, retrying once");
            if let Err(retry) = ctx.save(self.checkpoint) {
                error!(error = %retry, "checkpoint retry failed");
            }
            return Err(err);
        }

        if !ctx.invalid_files.is_empty() {
            warn!(count = ctx.invalid_files.len(), "some files are invalid");
            self.checkpoint.write_invalid_files(&ctx.invalid_files)?;
        }
        report.invalid_files = ctx.invalid_files;
        Ok(report)
    }

    fn run_source(
        &self,
        position: usize,
        total: usize,
        identifier: &str,
        options: &RunOptions,
        ctx: &mut SyncContext,
    ) -> SourceOutcome {
        let Some(source) = self.config.source(identifier) else {
            warn!(source = %identifier, "source is not configured, skip");
            return SourceOutcome::Skipped {
                reason: SkipReason::Unconfigured,
            };
        };
        if source.skip {
            info!(source = %identifier, "source is disabled, skip");
            return SourceOutcome::Skipped {
                reason: SkipReason::Disabled,
            };
        }

        info!(source = %identifier, "[{position}/{total}] fetching source");
        match self.sync_source(source, options, ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(source = %identifier, error = %err, "source failed and was skipped");
                if let Some(meta) = ctx.meta.sources.get_mut(identifier) {
                    meta.updated_at = self.env.clock.now();
                }
                SourceOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    fn sync_source(
        &self,
        source: &SourceConfig,
        options: &RunOptions,
        ctx: &mut SyncContext,
    ) -> Result<SourceOutcome, SyncError> {
        let state = source_state(source, options, ctx.meta.sources.get(&source.identifier));
        match state {
            SourceState::NeverInitialized | SourceState::PartiallyInitialized => {
                info!(source = %source.identifier, state = ?state, "source needs full ingest");
                return self.reinit(source, ctx);
            }
            SourceState::Ready => {}
        }

        let mut documents = Vec::with_capacity(source.files.len());
        for path in &source.files {
            match self.sync_document(source, path, options.force_fetch, ctx)? {
                DocumentStep::Continue(action) => documents.push(DocumentReport {
                    file: path.clone(),
                    action,
                }),
                DocumentStep::Reinit => return self.reinit(source, ctx),
            }
        }

        if let Some(meta) = ctx.meta.sources.get_mut(&source.identifier) {
            meta.updated_at = self.env.clock.now();
        }
        Ok(SourceOutcome::Updated { documents })
    }

    fn reinit(
        &self,
        source: &SourceConfig,
        ctx: &mut SyncContext,
    ) -> Result<SourceOutcome, SyncError> {
        self.initializer
            .init_source(&self.env, self.config, source, ctx)?;
        Ok(SourceOutcome::Initialized)
    }

    fn sync_document(
        &self,
        source: &SourceConfig,
        path: &str,
        force_fetch: bool,
        ctx: &mut SyncContext,
    ) -> Result<DocumentStep, SyncError> {
        let id = &source.identifier;
        let now = self.env.clock.now();
        let Some(source_meta) = ctx.meta.sources.get(id) else {
            return Ok(DocumentStep::Reinit);
        };
        let stored = source_meta.files.get(path).cloned();

        match gate_document(
            stored.as_ref(),
            now,
            self.config.file_min_updated_hours,
            force_fetch,
        ) {
            DocumentGate::Rebuild => {
                info!(source = %id, file = %path, "document needs rebuild");
                return Ok(DocumentStep::Reinit);
            }
            DocumentGate::SkipRecent {
                hours_since_checked,
            } => {
                info!(
                    source = %id,
                    file = %path,
                    hours = %format!("{hours_since_checked:.1}"),
                    "updated recently, skip"
                );
                return Ok(DocumentStep::Continue(DocumentAction::SkippedRecent));
            }
            DocumentGate::Due => {}
        }
        let Some(previous) = stored else {
            return Ok(DocumentStep::Reinit);
        };

        let branch = source
            .default_branch
            .clone()
            .or_else(|| source_meta.meta.default_branch.clone());
        let body = self
            .env
            .fetcher
            .fetch_body(source, path, branch.as_deref())?;
        let body_fingerprint = fingerprint(&body);

        if !force_fetch && body_fingerprint == previous.fingerprint {
            if let Some(meta) = ctx
                .meta
                .sources
                .get_mut(id)
                .and_then(|m| m.files.get_mut(path))
            {
                meta.checked_at = now;
            }
            info!(source = %id, file = %path, "unchanged");
            return Ok(DocumentStep::Continue(DocumentAction::Unchanged));
        }

        let file = FileRef::new(id.as_str(), path);
        let existing = match self.env.store.get_items(&file) {
            Ok(items) => items,
            Err(err) => {
                warn!(source = %id, file = %path, error = %err, "stored items unavailable, rebuilding source");
                return Ok(DocumentStep::Reinit);
            }
        };

        let context = FileContext::new(file.clone(), branch);
        let doc_items = self.env.parser.parse(&body, &context, &ctx.stars)?;
        let outcome = merge_items(&file, doc_items, &existing, self.env.renderer, now);

        self.env.store.update_file(&file, &body)?;
        self.env
            .store
            .update_items(&file, &outcome.items, &mut ctx.index)?;
        let file_meta = FileMeta {
            fingerprint: body_fingerprint,
            updated_at: outcome.updated_at.unwrap_or(previous.updated_at),
            checked_at: now,
            status: outcome.status(),
        };
        if let Some(meta) = ctx.meta.sources.get_mut(id) {
            meta.files.insert(path.to_string(), file_meta);
        }
        ctx.check_item_count(
            &file,
            outcome.total_count,
            self.config.invalid_item_threshold,
        );
        info!(
            source = %id,
            file = %path,
            new = outcome.new_count,
            total = outcome.total_count,
            "updated"
        );

        let repo = resolve_repo_meta(&self.env, source, ctx)?;
        if let Some(meta) = ctx.meta.sources.get_mut(id) {
            meta.meta = repo;
        }

        Ok(DocumentStep::Continue(DocumentAction::Updated {
            new_count: outcome.new_count,
            total_count: outcome.total_count,
        }))
    }
}
