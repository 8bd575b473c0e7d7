pub mod diff;
pub mod status;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};

use marklist_core::Config;

/// Load the config file, pointing at `--config` when it is missing.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_at(path).with_context(|| {
        format!(
            "failed to load config '{}' (use --config to point at another file)",
            path.display()
        )
    })?;
    tracing::debug!(
        config = %path.display(),
        data_dir = %config.data_dir.display(),
        sources = config.sources.len(),
        "loaded config"
    );
    Ok(config)
}
