//! Show and save run defaults.

use anyhow::{Context, Result};
use emr_config::RunConfig;
use emr_config::run::render_run_config;
use std::path::Path;
use tracing::info;

use super::TargetArgs;

pub fn show(saved: &RunConfig, path: &Path) -> Result<()> {
    if *saved == RunConfig::default() {
        println!("No saved configuration at {}", path.display());
        return Ok(());
    }
    print!("{}", render_run_config(saved));
    Ok(())
}

/// Merge `args` into the saved config and write it back.
pub fn save(args: &TargetArgs, saved: &RunConfig, path: &Path) -> Result<RunConfig> {
    let config = args.resolve(saved);
    config
        .save(path)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    info!(path = %path.display(), "Saved configuration");
    Ok(config)
}
