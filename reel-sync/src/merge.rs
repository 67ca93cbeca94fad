//! Merge engine: reconcile freshly paged items against a prior item list.
//!
//! ## Algorithm
//!
//! 1. Seed the known-id set from the prior items.
//! 2. Mode is `full` when there are no prior items, `incremental` otherwise.
//! 3. Consume pages newest first. In incremental mode the first known id
//!    stops the walk: no further page is requested. Unknown items are
//!    enriched (failures keep the item, without details) and accumulated.
//! 4. Full mode keeps the accumulator; incremental mode appends the prior
//!    items and drops repeated ids, first occurrence winning.
//! 5. Stable sort by `published_at`, newest first.
//!
//! Early-stop relies on the remote listing being newest first. Under
//! [`OrderCheck::Verify`] a newer-than-predecessor item switches the rest of
//! the walk to an exhaustive scan that skips known ids instead of stopping.
//! Only violations seen before the first known id are caught: once a known
//! id has stopped the walk, nothing after it is read.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use serde::Serialize;

use reel_core::{CollectionMeta, Item, ItemDetails, ItemId, OrderCheck};

use crate::error::SourceError;
use crate::limits::RemoteLimits;
use crate::pager::Pager;
use crate::source::{DetailEnricher, RemoteItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// First sync of the collection: every remote item is fetched.
    Full,
    /// Only items newer than the first known one are fetched.
    Incremental,
}

impl MergeMode {
    pub fn for_prior(prior: &[Item]) -> Self {
        if prior.is_empty() {
            Self::Full
        } else {
            Self::Incremental
        }
    }
}

/// Counters describing how a merge went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub pages_fetched: usize,
    pub new_items: usize,
    pub enrichment_failures: usize,
    /// A known item ended the walk.
    pub stopped_early: bool,
    /// The source broke newest-first ordering during the walk.
    pub order_violation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub mode: MergeMode,
    /// Merged items, newest first, unique by id.
    pub items: Vec<Item>,
    /// An enrichment failed or the walk ended on a fetch error.
    pub degraded: bool,
    /// First error met during the merge, in human-readable form.
    pub error_note: Option<String>,
    pub stats: MergeStats,
}

/// Merge the pages produced by `pager` into `prior`.
///
/// Never fails: remote errors degrade the outcome. If the very first page
/// cannot be fetched the prior items come back unchanged.
pub async fn merge(
    meta: &CollectionMeta,
    prior: &[Item],
    pager: &mut Pager<'_>,
    enricher: &dyn DetailEnricher,
    limits: &RemoteLimits,
    order_check: OrderCheck,
) -> MergeOutcome {
    let mode = MergeMode::for_prior(prior);
    let mut known: HashSet<ItemId> = prior.iter().map(|item| item.id.clone()).collect();
    let mut scan = Scan::new(mode, order_check);
    let mut accumulated = Vec::new();
    let mut stats = MergeStats::default();
    let mut first_error: Option<String> = None;

    while let Some(batch) = pager.next_batch().await {
        let fresh = scan.select(batch.items, &mut known);
        if !fresh.is_empty() {
            for (remote, result) in enrich_all(fresh, enricher, limits).await {
                let details = match result {
                    Ok(details) => details,
                    Err(err) => {
                        tracing::warn!(
                            collection = %meta.id,
                            item = %remote.id,
                            error = %err,
                            "enrichment failed, keeping item without details"
                        );
                        stats.enrichment_failures += 1;
                        first_error
                            .get_or_insert_with(|| format!("details for {}: {err}", remote.id));
                        None
                    }
                };
                accumulated.push(remote.into_item(details));
            }
        }
        if scan.stopped {
            break;
        }
    }

    stats.pages_fetched = pager.pages_fetched();
    stats.new_items = accumulated.len();
    stats.stopped_early = scan.stopped;
    stats.order_violation = scan.violation;

    if let Some(err) = pager.failure() {
        first_error.get_or_insert_with(|| format!("page {}: {err}", pager.pages_fetched()));
    }
    let degraded = first_error.is_some();

    if pager.failure().is_some() && pager.batches_received() == 0 {
        return MergeOutcome {
            mode,
            items: prior.to_vec(),
            degraded,
            error_note: first_error,
            stats,
        };
    }

    MergeOutcome {
        mode,
        items: compose(mode, accumulated, prior),
        degraded,
        error_note: first_error,
        stats,
    }
}

/// Steps 4 and 5: combine, drop repeated ids, sort newest first.
pub fn compose(mode: MergeMode, accumulated: Vec<Item>, prior: &[Item]) -> Vec<Item> {
    let mut items = accumulated;
    if mode == MergeMode::Incremental {
        items.extend(prior.iter().cloned());
    }
    dedup_by_id(&mut items);
    sort_newest_first(&mut items);
    items
}

/// Keep the first occurrence of every id; order otherwise untouched.
pub fn dedup_by_id(items: &mut Vec<Item>) {
    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.id.clone()));
}

/// Stable: items with equal timestamps keep their relative order.
pub fn sort_newest_first(items: &mut [Item]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

// ---------------------------------------------------------------------------
// Per-item selection
// ---------------------------------------------------------------------------

/// Decides, item by item, what to fetch and when to stop.
struct Scan {
    mode: MergeMode,
    order_check: OrderCheck,
    last_published: Option<DateTime<Utc>>,
    exhaustive: bool,
    stopped: bool,
    violation: bool,
}

impl Scan {
    fn new(mode: MergeMode, order_check: OrderCheck) -> Self {
        Self {
            mode,
            order_check,
            last_published: None,
            exhaustive: false,
            stopped: false,
            violation: false,
        }
    }

    /// Items of `batch` that need enrichment, in order. Sets `stopped` when
    /// a known item ends an incremental walk.
    fn select(&mut self, batch: Vec<RemoteItem>, known: &mut HashSet<ItemId>) -> Vec<RemoteItem> {
        let mut fresh = Vec::new();
        for item in batch {
            self.observe_order(&item);
            if known.contains(&item.id) {
                if self.mode == MergeMode::Incremental && !self.exhaustive {
                    self.stopped = true;
                    break;
                }
                continue;
            }
            known.insert(item.id.clone());
            fresh.push(item);
        }
        fresh
    }

    fn observe_order(&mut self, item: &RemoteItem) {
        if self.mode != MergeMode::Incremental || self.order_check != OrderCheck::Verify {
            return;
        }
        if let Some(previous) = self.last_published {
            if item.published_at > previous && !self.exhaustive {
                tracing::warn!(
                    item = %item.id,
                    published_at = %item.published_at,
                    previous = %previous,
                    "remote listing is not newest first, scanning the whole collection"
                );
                self.exhaustive = true;
                self.violation = true;
            }
        }
        self.last_published = Some(item.published_at);
    }
}

/// Enrich `items` concurrently (bounded by the shared limiter), returning
/// results in input order.
async fn enrich_all(
    items: Vec<RemoteItem>,
    enricher: &dyn DetailEnricher,
    limits: &RemoteLimits,
) -> Vec<(RemoteItem, Result<Option<ItemDetails>, SourceError>)> {
    stream::iter(items)
        .map(|item| async move {
            let result = limits.call("enrichment", enricher.fetch_details(&item.id)).await;
            (item, result)
        })
        .buffered(limits.max_concurrent())
        .collect()
        .await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, day: u32) -> Item {
        Item {
            id: ItemId::from(id),
            title: id.to_string(),
            description: String::new(),
            thumbnail_url: None,
            published_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            details: None,
        }
    }

    fn remote(id: &str, day: u32) -> RemoteItem {
        RemoteItem {
            id: ItemId::from(id),
            title: id.to_string(),
            description: String::new(),
            thumbnail_url: None,
            published_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id.0.as_str()).collect()
    }

    #[test]
    fn mode_follows_prior() {
        assert_eq!(MergeMode::for_prior(&[]), MergeMode::Full);
        assert_eq!(MergeMode::for_prior(&[item("a", 1)]), MergeMode::Incremental);
    }

    #[test]
    fn compose_incremental_prefers_new_copy() {
        let mut newer = item("v1", 3);
        newer.title = "fresh".to_string();
        let merged = compose(
            MergeMode::Incremental,
            vec![item("v2", 5), newer],
            &[item("v1", 3), item("v0", 1)],
        );
        assert_eq!(ids(&merged), vec!["v2", "v1", "v0"]);
        assert_eq!(merged[1].title, "fresh");
    }

    #[test]
    fn compose_full_ignores_prior() {
        let merged = compose(MergeMode::Full, vec![item("a", 1)], &[item("z", 9)]);
        assert_eq!(ids(&merged), vec!["a"]);
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let mut items = vec![item("x", 2), item("y", 4), item("z", 2), item("w", 4)];
        sort_newest_first(&mut items);
        assert_eq!(ids(&items), vec!["y", "w", "x", "z"]);
    }

    #[test]
    fn incremental_scan_stops_at_first_known() {
        let mut known: HashSet<ItemId> = [ItemId::from("v1")].into_iter().collect();
        let mut scan = Scan::new(MergeMode::Incremental, OrderCheck::Trust);
        let fresh = scan.select(
            vec![remote("v3", 6), remote("v2", 5), remote("v1", 3), remote("v0", 1)],
            &mut known,
        );
        assert_eq!(fresh.len(), 2);
        assert!(scan.stopped);
    }

    #[test]
    fn full_scan_skips_duplicates_without_stopping() {
        let mut known = HashSet::new();
        let mut scan = Scan::new(MergeMode::Full, OrderCheck::Verify);
        let fresh = scan.select(vec![remote("a", 3), remote("a", 3), remote("b", 2)], &mut known);
        assert_eq!(fresh.len(), 2);
        assert!(!scan.stopped);
    }

    #[test]
    fn order_violation_turns_stop_into_skip() {
        let mut known: HashSet<ItemId> = [ItemId::from("old")].into_iter().collect();
        let mut scan = Scan::new(MergeMode::Incremental, OrderCheck::Verify);
        // "late" is newer than its predecessor: the listing is not newest first.
        let fresh = scan.select(
            vec![remote("mid", 4), remote("late", 8), remote("old", 2), remote("lost", 1)],
            &mut known,
        );
        assert!(scan.violation);
        assert!(!scan.stopped);
        let fresh_ids: Vec<_> = fresh.iter().map(|r| r.id.0.as_str()).collect();
        assert_eq!(fresh_ids, vec!["mid", "late", "lost"]);
    }

    #[test]
    fn trust_mode_ignores_ordering() {
        let mut known: HashSet<ItemId> = [ItemId::from("old")].into_iter().collect();
        let mut scan = Scan::new(MergeMode::Incremental, OrderCheck::Trust);
        let fresh = scan.select(
            vec![remote("mid", 4), remote("late", 8), remote("old", 2), remote("lost", 1)],
            &mut known,
        );
        assert!(!scan.violation);
        assert!(scan.stopped);
        assert_eq!(fresh.len(), 2);
    }
}
