//! `marklist diff <source> <file>` — compare the stored document with GitHub.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use marklist_sync::pipeline;

/// Arguments for `marklist diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Source identifier (`owner/repo`).
    pub source: String,

    /// Document path within the source.
    pub file: String,
}

impl DiffArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let diff = pipeline::diff(&config, &self.source, &self.file)
            .with_context(|| format!("diff failed for '{}/{}'", self.source, self.file))?;

        if diff.is_unchanged() || diff.unified_diff.is_empty() {
            println!("No differences for '{}'.", diff.file);
            return Ok(());
        }
        if diff.stored_fingerprint.is_none() {
            println!("'{}' has not been synced yet; showing the full remote body.", diff.file);
        }

        print!("{}", diff.unified_diff);
        if !diff.unified_diff.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
