//! # reel-sync
//!
//! Incremental collection sync engine.
//!
//! A [`Pager`] walks a remote collection newest first, one page per request.
//! [`merge`] reconciles those pages with the stored items and stops at the
//! first known one. [`pipeline::run`] drives every collection of a target
//! concurrently under shared [`RemoteLimits`] and saves the snapshot once.

pub mod collection;
pub mod error;
pub mod limits;
pub mod merge;
pub mod pager;
pub mod pipeline;
pub mod report;
pub mod source;

pub use collection::CollectionSync;
pub use error::{SourceError, SyncError};
pub use limits::RemoteLimits;
pub use merge::{merge, MergeMode, MergeOutcome, MergeStats};
pub use pager::{Batch, Pager};
pub use pipeline::{run, RemoteSources, RunOptions};
pub use report::{CollectionReport, CollectionStatus, RunReport};
pub use source::{Catalog, DetailEnricher, Page, PageSource, RemoteItem};
