//! reel core library — domain types, snapshot persistence, configuration.
//!
//! - [`types`] — id newtypes, items, collections, the snapshot
//! - [`store`] — [`SnapshotStore`] contract and the JSON file store
//! - [`config`] — YAML + environment run configuration
//! - [`error`] — [`SnapshotError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{Config, MetadataRefresh, OrderCheck, SyncTarget};
pub use error::{ConfigError, SnapshotError};
pub use store::{JsonFileStore, MemoryStore, SnapshotStore};
pub use types::{
    Collection, CollectionId, CollectionMeta, Item, ItemDetails, ItemId, Snapshot,
    SNAPSHOT_VERSION,
};
