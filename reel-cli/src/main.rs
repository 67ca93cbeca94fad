//! reel — incremental YouTube playlist sync.
//!
//! # Usage
//!
//! ```text
//! reel init [--force]
//! reel sync [--config reel.yaml] [--snapshot playlists.json] [--dry-run] [--json] [--strict]
//! reel status [--snapshot playlists.json] [--json]
//! ```
//!
//! Exit status: 0 on a completed run, 1 on configuration or persistence
//! failure, 2 with `--strict` when any playlist was degraded or skipped.

mod commands;
mod telemetry;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{init::InitArgs, status::StatusArgs, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "reel",
    version,
    about = "Keep a local snapshot of a channel's playlists in sync",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter reel.yaml in the current directory.
    Init(InitArgs),

    /// Fetch new videos and update the snapshot.
    Sync(SyncArgs),

    /// Summarize the stored snapshot without touching the network.
    Status(StatusArgs),
}

fn main() -> ExitCode {
    // A missing .env is fine; the environment may already carry the key.
    let _ = dotenvy::dotenv();
    telemetry::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Init(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run().map(|()| ExitCode::SUCCESS),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
