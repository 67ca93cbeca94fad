//! In-memory remote shared by the integration tests.
//!
//! `FakeRemote` plays catalog, page source and detail enricher at once. It
//! pages by numeric offset cursors and counts every call so tests can check
//! how much of the remote a sync actually touched.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use reel_core::{Collection, CollectionId, CollectionMeta, Item, ItemDetails, ItemId};
use reel_sync::{
    Catalog, DetailEnricher, Page, PageSource, RemoteItem, RemoteLimits, RemoteSources,
    SourceError,
};

pub const CHANNEL: &str = "UCfake";

/// `2024-01-01T00:00Z` plus `hours`.
pub fn at(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::hours(hours)
}

pub fn run_started() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn remote_item(id: &str, published_at: DateTime<Utc>) -> RemoteItem {
    RemoteItem {
        id: ItemId::from(id),
        title: format!("Video {id}"),
        description: String::new(),
        thumbnail_url: Some(format!("https://i.ytimg.com/vi/{id}/mqdefault.jpg")),
        published_at,
    }
}

pub fn stored_item(id: &str, published_at: DateTime<Utc>) -> Item {
    remote_item(id, published_at).into_item(Some(details_for(&ItemId::from(id))))
}

/// `count` items newest first, ids `v{count-1}` down to `v0`, one hour apart.
pub fn descending(count: usize) -> Vec<RemoteItem> {
    (0..count)
        .rev()
        .map(|i| remote_item(&format!("v{i}"), at(i as i64)))
        .collect()
}

pub fn meta(id: &str, title: &str) -> CollectionMeta {
    CollectionMeta {
        id: CollectionId::from(id),
        title: title.to_string(),
        description: format!("{title} description"),
        thumbnail_url: None,
    }
}

pub fn details_for(id: &ItemId) -> ItemDetails {
    ItemDetails {
        duration: Some("PT10M".to_string()),
        view_count: Some(id.0.len() as u64 * 100),
        like_count: Some(7),
        comment_count: None,
        favorite_count: Some(0),
    }
}

pub fn stored_collection(meta: CollectionMeta, items: Vec<Item>) -> Collection {
    Collection::from_parts(meta, items, at(-24), None)
}

pub fn limits() -> RemoteLimits {
    RemoteLimits::new(4, Duration::from_secs(5))
}

#[derive(Default)]
struct State {
    collections: BTreeMap<CollectionId, (CollectionMeta, Vec<RemoteItem>)>,
    page_calls: HashMap<CollectionId, usize>,
    detail_calls: Vec<ItemId>,
    /// Fail the page request with this 0-based index.
    failing_pages: HashMap<CollectionId, usize>,
    failing_details: HashSet<ItemId>,
    slow_pages: HashMap<CollectionId, Duration>,
    panicking_pages: HashSet<CollectionId>,
    catalog_down: bool,
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_collection(self: &Arc<Self>, meta: CollectionMeta, items: Vec<RemoteItem>) {
        self.lock().collections.insert(meta.id.clone(), (meta, items));
    }

    pub fn fail_page(&self, collection: &str, index: usize) {
        self.lock()
            .failing_pages
            .insert(CollectionId::from(collection), index);
    }

    pub fn fail_details(&self, item: &str) {
        self.lock().failing_details.insert(ItemId::from(item));
    }

    pub fn slow_pages(&self, collection: &str, delay: Duration) {
        self.lock()
            .slow_pages
            .insert(CollectionId::from(collection), delay);
    }

    pub fn panic_on_pages(&self, collection: &str) {
        self.lock()
            .panicking_pages
            .insert(CollectionId::from(collection));
    }

    pub fn catalog_down(&self, down: bool) {
        self.lock().catalog_down = down;
    }

    pub fn page_calls(&self, collection: &str) -> usize {
        self.lock()
            .page_calls
            .get(&CollectionId::from(collection))
            .copied()
            .unwrap_or(0)
    }

    pub fn detail_calls(&self) -> Vec<ItemId> {
        self.lock().detail_calls.clone()
    }

    pub fn reset_counters(&self) {
        let mut state = self.lock();
        state.page_calls.clear();
        state.detail_calls.clear();
    }

    pub fn sources(self: &Arc<Self>) -> RemoteSources {
        RemoteSources::from_client(self.clone(), limits())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl PageSource for FakeRemote {
    async fn fetch_page(
        &self,
        collection: &CollectionId,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<Page, SourceError> {
        let (index, delay, panics, fails) = {
            let mut state = self.lock();
            let calls = state.page_calls.entry(collection.clone()).or_insert(0);
            let index = *calls;
            *calls += 1;
            (
                index,
                state.slow_pages.get(collection).copied(),
                state.panicking_pages.contains(collection),
                state.failing_pages.get(collection) == Some(&index),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if panics {
            panic!("page source blew up for {collection}");
        }
        if fails {
            return Err(SourceError::Api {
                status: 403,
                message: format!("quotaExceeded on page {index}"),
            });
        }

        let state = self.lock();
        let (_, items) = state
            .collections
            .get(collection)
            .ok_or_else(|| SourceError::NotFound(collection.to_string()))?;
        let offset: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (offset + page_size as usize).min(items.len());
        Ok(Page {
            items: items[offset.min(end)..end].to_vec(),
            next_cursor: (end < items.len()).then(|| end.to_string()),
        })
    }
}

#[async_trait]
impl DetailEnricher for FakeRemote {
    async fn fetch_details(&self, item: &ItemId) -> Result<Option<ItemDetails>, SourceError> {
        let mut state = self.lock();
        state.detail_calls.push(item.clone());
        if state.failing_details.contains(item) {
            return Err(SourceError::Transport(format!("connection reset on {item}")));
        }
        Ok(Some(details_for(item)))
    }
}

#[async_trait]
impl Catalog for FakeRemote {
    async fn resolve_channel(&self, handle: &str) -> Result<String, SourceError> {
        if self.lock().catalog_down {
            return Err(SourceError::Transport("dns failure".to_string()));
        }
        match handle {
            "@fake" | CHANNEL => Ok(CHANNEL.to_string()),
            other => Err(SourceError::NotFound(other.to_string())),
        }
    }

    async fn list_collections(&self, _channel_id: &str) -> Result<Vec<CollectionMeta>, SourceError> {
        let state = self.lock();
        if state.catalog_down {
            return Err(SourceError::Transport("dns failure".to_string()));
        }
        Ok(state.collections.values().map(|(m, _)| m.clone()).collect())
    }

    async fn describe_collections(
        &self,
        ids: &[CollectionId],
    ) -> Result<Vec<CollectionMeta>, SourceError> {
        let state = self.lock();
        if state.catalog_down {
            return Err(SourceError::Transport("dns failure".to_string()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| state.collections.get(id).map(|(m, _)| m.clone()))
            .collect())
    }
}
