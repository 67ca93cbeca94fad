//! What a run did, per collection and overall.

use chrono::{DateTime, Utc};
use serde::Serialize;

use reel_core::CollectionId;

use crate::merge::MergeMode;

/// Outcome of one collection in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionStatus {
    /// Every page and every enrichment succeeded.
    Synced,
    /// Completed with partial data; nothing previously stored was lost.
    Degraded { note: String },
    /// Not synced this run; the stored entry (if any) is unchanged.
    Skipped { reason: String },
}

impl CollectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CollectionStatus::Synced => "synced",
            CollectionStatus::Degraded { .. } => "degraded",
            CollectionStatus::Skipped { .. } => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub id: CollectionId,
    pub title: String,
    #[serde(flatten)]
    pub status: CollectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<MergeMode>,
    pub new_items: usize,
    pub total_items: usize,
    pub pages_fetched: usize,
    pub enrichment_failures: usize,
    pub stopped_early: bool,
    pub order_violation: bool,
}

impl CollectionReport {
    /// Report for a collection that was not synced. `total_items` is what
    /// the snapshot still holds for it.
    pub fn skipped(
        id: CollectionId,
        title: impl Into<String>,
        total_items: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            status: CollectionStatus::Skipped {
                reason: reason.into(),
            },
            mode: None,
            new_items: 0,
            total_items,
            pages_fetched: 0,
            enrichment_failures: 0,
            stopped_early: false,
            order_violation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub collections: Vec<CollectionReport>,
    /// Collections dropped because they no longer exist remotely.
    pub pruned: Vec<CollectionId>,
    /// Set when the collection catalog itself could not be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_error: Option<String>,
    pub snapshot_written: bool,
    pub dry_run: bool,
}

impl RunReport {
    pub fn count(&self, label: &str) -> usize {
        self.collections
            .iter()
            .filter(|c| c.status.label() == label)
            .count()
    }

    pub fn synced(&self) -> usize {
        self.count("synced")
    }

    pub fn degraded(&self) -> usize {
        self.count("degraded")
    }

    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    pub fn new_items(&self) -> usize {
        self.collections.iter().map(|c| c.new_items).sum()
    }

    /// Every collection fully synced and the catalog resolved.
    pub fn is_clean(&self) -> bool {
        self.catalog_error.is_none()
            && self
                .collections
                .iter()
                .all(|c| c.status == CollectionStatus::Synced)
    }
}
