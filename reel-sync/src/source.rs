//! Remote collaborators consumed by the sync engine.
//!
//! Implementations own their client handle; the engine only sees these
//! traits. Timeouts and concurrency caps are applied by the caller through
//! [`RemoteLimits`](crate::limits::RemoteLimits), not by implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use reel_core::{CollectionId, CollectionMeta, Item, ItemDetails, ItemId};

use crate::error::SourceError;

/// An item as listed by the remote page source, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl RemoteItem {
    pub fn into_item(self, details: Option<ItemDetails>) -> Item {
        Item {
            id: self.id,
            title: self.title,
            description: self.description,
            thumbnail_url: self.thumbnail_url,
            published_at: self.published_at,
            details,
        }
    }
}

/// One page of a collection listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<RemoteItem>,
    /// Continuation cursor; `None` when this is the last page.
    pub next_cursor: Option<String>,
}

/// Supplies pages of a collection, newest first.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        collection: &CollectionId,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<Page, SourceError>;
}

/// Fetches supplementary attributes for a single item.
#[async_trait]
pub trait DetailEnricher: Send + Sync {
    /// `Ok(None)` means the remote knows nothing extra about the item.
    async fn fetch_details(&self, item: &ItemId) -> Result<Option<ItemDetails>, SourceError>;
}

/// Discovers which collections exist and their current metadata.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Turn a channel handle (`@name`) into a channel id. Ids pass through.
    async fn resolve_channel(&self, handle: &str) -> Result<String, SourceError>;

    /// Every collection owned by `channel_id`.
    async fn list_collections(&self, channel_id: &str)
        -> Result<Vec<CollectionMeta>, SourceError>;

    /// Metadata for the given ids. Ids unknown to the remote are omitted.
    async fn describe_collections(
        &self,
        ids: &[CollectionId],
    ) -> Result<Vec<CollectionMeta>, SourceError>;
}
