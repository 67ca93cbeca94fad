//! `reel init [--config reel.yaml] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use reel_core::config::{Config, DEFAULT_CONFIG_FILE};

/// Write a commented starter configuration.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration.
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        if self.config.exists() && !self.force {
            bail!(
                "'{}' already exists; pass --force to overwrite it",
                self.config.display()
            );
        }
        if let Some(parent) = self.config.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create '{}'", parent.display()))?;
        }
        std::fs::write(&self.config, Config::template())
            .with_context(|| format!("failed to write '{}'", self.config.display()))?;

        println!("✓ Wrote {}", self.config.display());
        println!("  Set `channel` (or `playlists`), export YOUTUBE_API_KEY, then run `reel sync`.");
        Ok(())
    }
}
