//! Domain types for synchronized collections.
//!
//! All timestamps are `DateTime<Utc>`. On-disk field names are camelCase;
//! a few aliases accept the flat-array layout written by older tooling.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Current on-disk snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Stable identifier of a remote collection (a playlist id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub String);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CollectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Stable identifier of an item inside a collection (a video id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Supplementary attributes fetched per item. Every field is optional: the
/// remote side omits counters it does not expose.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    /// ISO-8601 duration as reported by the remote source (`PT4M13S`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_count: Option<u64>,
}

impl ItemDetails {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One element of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ItemRecord")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub published_at: DateTime<Utc>,
    /// `None` when enrichment failed or has not happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ItemDetails>,
}

/// On-disk item as read back. Older tooling stored the details flat on the
/// item, with counters as strings (or `"N/A"`); those are folded into
/// `details` when no nested object is present.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemRecord {
    id: ItemId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "thumbnail", deserialize_with = "empty_as_none")]
    thumbnail_url: Option<String>,
    published_at: DateTime<Utc>,
    #[serde(default)]
    details: Option<ItemDetails>,
    #[serde(default, deserialize_with = "empty_as_none")]
    duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    like_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    comment_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    favorite_count: Option<u64>,
}

impl From<ItemRecord> for Item {
    fn from(record: ItemRecord) -> Self {
        let details = record.details.or_else(|| {
            let flat = ItemDetails {
                duration: record.duration,
                view_count: record.view_count,
                like_count: record.like_count,
                comment_count: record.comment_count,
                favorite_count: record.favorite_count,
            };
            (!flat.is_empty()).then_some(flat)
        });
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            thumbnail_url: record.thumbnail_url,
            published_at: record.published_at,
            details,
        }
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Collection metadata as reported by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMeta {
    pub id: CollectionId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// A synchronized collection: metadata plus items ordered newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        alias = "thumbnail",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail_url: Option<String>,
    #[serde(default, alias = "videos")]
    pub items: Vec<Item>,
    #[serde(default, alias = "videoCount")]
    pub item_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Collection {
    /// Build a collection from fresh metadata and an already merged item list.
    pub fn from_parts(
        meta: CollectionMeta,
        items: Vec<Item>,
        last_updated: DateTime<Utc>,
        last_error: Option<String>,
    ) -> Self {
        let mut collection = Self {
            id: meta.id,
            title: meta.title,
            description: meta.description,
            thumbnail_url: meta.thumbnail_url,
            item_count: items.len(),
            items,
            last_updated: Some(last_updated),
            last_error,
        };
        collection.normalize();
        collection
    }

    pub fn meta(&self) -> CollectionMeta {
        CollectionMeta {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }

    /// Drop repeated item ids (first occurrence wins), stable-sort newest
    /// first and recompute `item_count`.
    pub fn normalize(&mut self) {
        let mut seen = HashSet::with_capacity(self.items.len());
        self.items.retain(|item| seen.insert(item.id.clone()));
        self.items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        self.item_count = self.items.len();
    }

    /// Newest `published_at` among the items, if any.
    pub fn newest_published_at(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(|item| item.published_at).max()
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Every known collection, keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub collections: BTreeMap<CollectionId, Collection>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            collections: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    pub fn get(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.get(id)
    }

    /// Insert or replace the entry for `collection.id`.
    pub fn insert(&mut self, collection: Collection) -> Option<Collection> {
        self.collections.insert(collection.id.clone(), collection)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    /// Build a snapshot from the legacy flat array. Later duplicates of a
    /// collection id are ignored.
    pub fn from_list(list: Vec<Collection>) -> Self {
        let mut snapshot = Self::default();
        for collection in list {
            snapshot
                .collections
                .entry(collection.id.clone())
                .or_insert(collection);
        }
        snapshot
    }
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Counter that may be a number, a decimal string or a placeholder such as
/// `"N/A"`. Anything unparseable is `None`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        Some(Raw::Other(_)) | None => None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
