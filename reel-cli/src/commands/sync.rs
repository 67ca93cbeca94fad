//! `reel sync` — bring the snapshot up to date with the remote playlists.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use reel_core::config::{Config, DEFAULT_CONFIG_FILE};
use reel_core::JsonFileStore;
use reel_sync::{
    pipeline, CollectionReport, CollectionStatus, RemoteLimits, RemoteSources, RunOptions,
    RunReport,
};
use reel_youtube::YoutubeClient;

/// Exit status of `--strict` runs that did not sync everything.
const EXIT_INCOMPLETE: u8 = 2;

/// Arguments for `reel sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Configuration file. A missing file means defaults plus environment.
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Snapshot file, overriding the configuration.
    #[arg(long, short = 's')]
    pub snapshot: Option<PathBuf>,

    /// Sync and report, but do not write the snapshot.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Exit with status 2 when any playlist is degraded or skipped.
    #[arg(long)]
    pub strict: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<ExitCode> {
        let mut config = Config::load_at(&self.config)
            .with_context(|| format!("failed to load '{}'", self.config.display()))?;
        config.apply_env();
        if let Some(path) = self.snapshot.clone() {
            config.snapshot_path = path;
        }
        let api_key = config.validate().context("invalid configuration")?;
        let target = config
            .target()
            .context("invalid configuration: nothing to sync")?;

        let client = YoutubeClient::from_config(&config, api_key)
            .context("failed to set up the YouTube client")?;
        let limits = RemoteLimits::new(config.max_concurrent_requests, config.request_timeout());
        let remote = RemoteSources::from_client(Arc::new(client), limits);
        let store = JsonFileStore::new(&config.snapshot_path);
        let options = RunOptions::from_config(&config, self.dry_run);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start the async runtime")?;
        let report = runtime
            .block_on(pipeline::run(&store, &remote, &target, &options))
            .with_context(|| {
                format!(
                    "sync failed; '{}' was left unchanged",
                    config.snapshot_path.display()
                )
            })?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            print_report(&report, &config.snapshot_path);
        }

        if self.strict && !report.is_clean() {
            return Ok(ExitCode::from(EXIT_INCOMPLETE));
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(report: &RunReport, snapshot: &std::path::Path) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    if let Some(err) = &report.catalog_error {
        println!("{prefix}{} playlist catalog unavailable: {err}", "✗".red().bold());
    }
    if report.collections.is_empty() && report.catalog_error.is_none() {
        println!("{prefix}No playlists found.");
    }
    for collection in &report.collections {
        println!("{prefix}{}", collection_line(collection));
    }
    for id in &report.pruned {
        println!("{prefix}{} '{id}' removed remotely, pruned", "-".bright_black());
    }

    let summary = format!(
        "{} synced, {} degraded, {} skipped, {} new videos",
        report.synced(),
        report.degraded(),
        report.skipped(),
        report.new_items()
    );
    if report.snapshot_written {
        println!("{summary} → {}", snapshot.display());
    } else {
        println!("{prefix}{summary} (snapshot not written)");
    }
}

fn collection_line(c: &CollectionReport) -> String {
    let name = if c.title.is_empty() {
        format!("'{}'", c.id)
    } else {
        format!("'{}' ({})", c.title, c.id)
    };
    let counts = format!(
        "+{} new, {} total, {} page{}",
        c.new_items,
        c.total_items,
        c.pages_fetched,
        if c.pages_fetched == 1 { "" } else { "s" }
    );
    match &c.status {
        CollectionStatus::Synced => format!("{} {name} synced ({counts})", "✓".green().bold()),
        CollectionStatus::Degraded { note } => format!(
            "{} {name} degraded ({counts}): {note}",
            "!".yellow().bold()
        ),
        CollectionStatus::Skipped { reason } => {
            format!("{} {name} skipped: {reason}", "✗".red().bold())
        }
    }
}
