//! `marklist sync` — fetch sources and merge changed items.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use marklist_core::RunOptions;
use marklist_sync::{pipeline, DocumentAction, RunReport, SkipReason, SourceOutcome};

/// Arguments for `marklist sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Sources to sync (`owner/repo`); every configured source when omitted.
    pub sources: Vec<String>,

    /// Fetch and re-merge documents even when recently checked or unchanged.
    #[arg(long)]
    pub force: bool,

    /// With explicit sources, rebuild them from scratch.
    #[arg(long)]
    pub rebuild: bool,

    /// Process at most N sources.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let options = RunOptions {
            sources: self.sources,
            force_fetch: self.force,
            rebuild: self.rebuild,
            limit: self.limit,
        };

        let report = pipeline::run(&config, &options).context("sync failed")?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
            return Ok(());
        }
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    if report.sources.is_empty() {
        println!("No sources selected.");
        return;
    }

    for source in &report.sources {
        let id = &source.identifier;
        match &source.outcome {
            SourceOutcome::Skipped { reason } => {
                let why = match reason {
                    SkipReason::Unconfigured => "not configured",
                    SkipReason::Disabled => "disabled",
                };
                println!("{} '{id}' skipped ({why})", "·".bright_black());
            }
            SourceOutcome::Initialized => {
                println!("{} '{id}' initialized", "✓".green());
            }
            SourceOutcome::Updated { documents } => {
                println!("{} '{id}' synced", "✓".green());
                for doc in documents {
                    match &doc.action {
                        DocumentAction::SkippedRecent => println!("  ·  {} (recent)", doc.file),
                        DocumentAction::Unchanged => println!("  ·  {} (unchanged)", doc.file),
                        DocumentAction::Updated {
                            new_count,
                            total_count,
                        } => println!("  ✎  {} ({new_count} new / {total_count} items)", doc.file),
                    }
                }
            }
            SourceOutcome::Failed { error } => {
                println!("{} '{id}' failed: {error}", "✗".red());
            }
        }
    }

    if !report.invalid_files.is_empty() {
        println!(
            "{} {} file(s) yielded too few items:",
            "!".yellow().bold(),
            report.invalid_files.len()
        );
        for file in &report.invalid_files {
            println!("  {}/{}", file.source_identifier, file.file);
        }
    }
}
