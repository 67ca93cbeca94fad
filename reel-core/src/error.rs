//! Error types for reel-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or writing the snapshot document.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Underlying I/O failure, with the path that was being touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file exists but is not a readable snapshot document.
    #[error("failed to parse snapshot at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (save path).
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading or validating the run configuration.
///
/// All of these are fatal: they are reported before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the config path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No API credential in the config file or `YOUTUBE_API_KEY`.
    #[error("YOUTUBE_API_KEY is not set and the config has no api_key")]
    MissingApiKey,

    /// Neither a channel nor explicit playlist ids were configured.
    #[error("nothing to sync: set `channel` (or REEL_CHANNEL) or list `playlists`")]
    MissingTarget,
}

pub(crate) fn snapshot_io(path: impl Into<PathBuf>, source: std::io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: path.into(),
        source,
    }
}
