//! Error types for reel-sync.

use std::time::Duration;

use thiserror::Error;

use reel_core::SnapshotError;

/// Failure of a single remote call (page fetch, enrichment, catalog lookup).
///
/// These never abort a run: the pager and merge engine turn them into a
/// degraded collection, the pipeline into a skipped one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The call did not finish within the configured per-call timeout.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// Connection, TLS or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with an error status (quota, auth, 5xx...).
    #[error("remote returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The requested channel or collection does not exist remotely.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The request limiter was shut down.
    #[error("request limiter closed")]
    Closed,
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The merged snapshot could not be persisted; nothing was written.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}
