//! `reel status` — what the stored snapshot holds.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use reel_core::config::{Config, DEFAULT_CONFIG_FILE};
use reel_core::{Collection, JsonFileStore, Snapshot};

/// Arguments for `reel status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Configuration file, used to locate the snapshot.
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Snapshot file, overriding the configuration.
    #[arg(long, short = 's')]
    pub snapshot: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let path = match self.snapshot.clone() {
            Some(path) => path,
            None => {
                let mut config = Config::load_at(&self.config)
                    .with_context(|| format!("failed to load '{}'", self.config.display()))?;
                config.apply_env();
                config.snapshot_path
            }
        };

        let store = JsonFileStore::new(&path);
        let snapshot = store
            .read()
            .with_context(|| format!("cannot read snapshot '{}'", path.display()))?;
        let rows = snapshot.as_ref().map(build_rows).unwrap_or_default();

        if self.json {
            print_json(&path, snapshot.is_some(), rows)?;
            return Ok(());
        }
        match snapshot {
            None => println!(
                "No snapshot at '{}'. Run `reel sync` first.",
                path.display()
            ),
            Some(_) => print_table(&path, rows),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
struct CollectionRow {
    id: String,
    title: String,
    items: usize,
    /// Items whose details could not be fetched.
    missing_details: usize,
    newest: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
    last_updated_age: String,
    last_error: Option<String>,
}

#[derive(Serialize)]
struct StatusJson {
    snapshot: String,
    exists: bool,
    summary: SummaryJson,
    collections: Vec<CollectionRow>,
}

#[derive(Serialize)]
struct SummaryJson {
    collections: usize,
    items: usize,
    with_errors: usize,
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "playlist")]
    id: String,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "videos")]
    items: usize,
    #[tabled(rename = "newest")]
    newest: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
    #[tabled(rename = "last error")]
    last_error: String,
}

fn build_rows(snapshot: &Snapshot) -> Vec<CollectionRow> {
    snapshot.iter().map(row).collect()
}

fn row(c: &Collection) -> CollectionRow {
    CollectionRow {
        id: c.id.to_string(),
        title: c.title.clone(),
        items: c.items.len(),
        missing_details: c.items.iter().filter(|i| i.details.is_none()).count(),
        newest: c.newest_published_at(),
        last_updated: c.last_updated,
        last_updated_age: c
            .last_updated
            .map(format_datetime_age)
            .unwrap_or_else(|| "never".to_string()),
        last_error: c.last_error.clone(),
    }
}

fn print_json(path: &std::path::Path, exists: bool, rows: Vec<CollectionRow>) -> Result<()> {
    let payload = StatusJson {
        snapshot: path.display().to_string(),
        exists,
        summary: SummaryJson {
            collections: rows.len(),
            items: rows.iter().map(|r| r.items).sum(),
            with_errors: rows.iter().filter(|r| r.last_error.is_some()).count(),
        },
        collections: rows,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(path: &std::path::Path, rows: Vec<CollectionRow>) {
    let items: usize = rows.iter().map(|r| r.items).sum();
    let with_errors = rows.iter().filter(|r| r.last_error.is_some()).count();
    println!(
        "reel v{} | {} | {} playlists | {} videos | {} with errors",
        env!("CARGO_PKG_VERSION"),
        path.display(),
        rows.len(),
        items,
        with_errors,
    );
    if rows.is_empty() {
        println!("Snapshot is empty.");
        return;
    }

    let table_rows: Vec<TableRow> = rows
        .into_iter()
        .map(|r| TableRow {
            id: r.id,
            title: truncate(&r.title, 40),
            items: r.items,
            newest: r
                .newest
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
            last_sync: r.last_updated_age,
            last_error: r
                .last_error
                .map(|e| truncate(&e, 48).yellow().to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if with_errors > 0 {
        println!("Run 'reel sync' to retry playlists with errors.");
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Compact age such as `42s ago` or `2d ago`.
fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    format_seconds(seconds)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    if seconds < 60 * 60 {
        return format!("{}m ago", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h ago", seconds / (60 * 60));
    }
    format!("{}d ago", seconds / (60 * 60 * 24))
}
