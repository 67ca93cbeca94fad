//! Sync run entrypoint used by the CLI.
//!
//! A run loads the snapshot once, resolves the target collections through
//! the catalog, syncs every collection in its own task, and saves the
//! assembled snapshot once after all tasks have finished.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use reel_core::{
    Collection, CollectionId, CollectionMeta, Config, MetadataRefresh, OrderCheck, Snapshot,
    SnapshotStore, SyncTarget,
};

use crate::collection::CollectionSync;
use crate::error::{SourceError, SyncError};
use crate::limits::RemoteLimits;
use crate::report::{CollectionReport, RunReport};
use crate::source::{Catalog, DetailEnricher, PageSource};

/// Per-run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub page_size: u32,
    pub order_check: OrderCheck,
    pub metadata_refresh: MetadataRefresh,
    pub prune_removed: bool,
    /// Sync and report, but do not save.
    pub dry_run: bool,
    /// Stamped into `last_updated`. Fixed by the caller so that two runs
    /// over unchanged remote data produce identical snapshots.
    pub started_at: DateTime<Utc>,
}

impl RunOptions {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            page_size: config.page_size,
            order_check: config.order_check,
            metadata_refresh: config.metadata_refresh,
            prune_removed: config.prune_removed,
            dry_run,
            started_at: Utc::now(),
        }
    }
}

/// The remote side of a run: one handle per role plus the shared limits.
#[derive(Clone)]
pub struct RemoteSources {
    pub catalog: Arc<dyn Catalog>,
    pub pages: Arc<dyn PageSource>,
    pub enricher: Arc<dyn DetailEnricher>,
    pub limits: RemoteLimits,
}

impl RemoteSources {
    /// Use one client for all three roles.
    pub fn from_client<C>(client: Arc<C>, limits: RemoteLimits) -> Self
    where
        C: Catalog + PageSource + DetailEnricher + 'static,
    {
        Self {
            catalog: client.clone(),
            pages: client.clone(),
            enricher: client,
            limits,
        }
    }
}

/// Collections the catalog resolved, plus requested ids it does not know.
#[derive(Debug, Default)]
struct Resolved {
    found: Vec<CollectionMeta>,
    missing: Vec<CollectionId>,
}

/// Run one sync over `target`.
///
/// Only a failed save is an error. Remote failures of any kind end up in the
/// report as degraded or skipped collections.
pub async fn run(
    store: &dyn SnapshotStore,
    remote: &RemoteSources,
    target: &SyncTarget,
    options: &RunOptions,
) -> Result<RunReport, SyncError> {
    let prior = store.load();
    tracing::info!(
        collections = prior.len(),
        dry_run = options.dry_run,
        "sync started"
    );

    let mut report = RunReport {
        started_at: options.started_at,
        collections: Vec::new(),
        pruned: Vec::new(),
        catalog_error: None,
        snapshot_written: false,
        dry_run: options.dry_run,
    };

    let resolved = match resolve(remote, target).await {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!(error = %err, "catalog unavailable, skipping every collection");
            report.collections = skip_all(&prior, target, &format!("catalog unavailable: {err}"));
            report.catalog_error = Some(err.to_string());
            // Nothing changed; the stored snapshot stays as it is.
            return Ok(report);
        }
    };

    let removed = removed_ids(&prior, target, &resolved);
    let Resolved { found, missing } = resolved;

    let mut next = prior.clone();
    let synced = sync_all(remote, options, &prior, found).await;
    for (id, outcome) in synced {
        match outcome {
            Ok((collection, collection_report)) => {
                next.insert(collection);
                report.collections.push(collection_report);
            }
            Err(reason) => {
                let (title, total) = stored_summary(&prior, &id);
                tracing::warn!(collection = %id, reason = %reason, "collection skipped");
                report
                    .collections
                    .push(CollectionReport::skipped(id, title, total, reason));
            }
        }
    }

    for id in removed {
        if options.prune_removed && prior.get(&id).is_some() {
            tracing::info!(collection = %id, "collection removed remotely, pruning");
            next.collections.remove(&id);
            report.pruned.push(id);
        } else if missing.contains(&id) {
            let (title, total) = stored_summary(&prior, &id);
            tracing::warn!(collection = %id, "collection not found remotely");
            report.collections.push(CollectionReport::skipped(
                id,
                title,
                total,
                "not found remotely",
            ));
        } else {
            tracing::info!(collection = %id, "collection no longer listed, keeping stored copy");
        }
    }

    if options.dry_run {
        tracing::info!(collections = next.len(), "dry run, snapshot not written");
        return Ok(report);
    }
    store.save(&next)?;
    report.snapshot_written = true;
    tracing::info!(
        collections = next.len(),
        synced = report.synced(),
        degraded = report.degraded(),
        skipped = report.skipped(),
        "sync finished"
    );
    Ok(report)
}

async fn resolve(remote: &RemoteSources, target: &SyncTarget) -> Result<Resolved, SourceError> {
    let catalog = remote.catalog.as_ref();
    let limits = &remote.limits;
    match target {
        SyncTarget::Channel(handle) => {
            let channel_id = limits
                .call("channel lookup", catalog.resolve_channel(handle))
                .await?;
            tracing::debug!(handle = %handle, channel_id = %channel_id, "channel resolved");
            let mut found = limits
                .call("collection listing", catalog.list_collections(&channel_id))
                .await?;
            dedup_metas(&mut found);
            Ok(Resolved {
                found,
                missing: Vec::new(),
            })
        }
        SyncTarget::Playlists(ids) => {
            let mut requested = Vec::with_capacity(ids.len());
            let mut seen = HashSet::new();
            for id in ids {
                if seen.insert(id.clone()) {
                    requested.push(id.clone());
                }
            }
            let described = limits
                .call("collection lookup", catalog.describe_collections(&requested))
                .await?;

            // Keep the requested order; anything the catalog did not return is missing.
            let mut resolved = Resolved::default();
            for id in requested {
                match described.iter().find(|meta| meta.id == id) {
                    Some(meta) => resolved.found.push(meta.clone()),
                    None => resolved.missing.push(id),
                }
            }
            Ok(resolved)
        }
    }
}

type TaskOutcome = Result<(Collection, CollectionReport), String>;

/// Spawn one task per collection and wait for all of them. Results come back
/// in the order of `metas`.
async fn sync_all(
    remote: &RemoteSources,
    options: &RunOptions,
    prior: &Snapshot,
    metas: Vec<CollectionMeta>,
) -> Vec<(CollectionId, TaskOutcome)> {
    let sync = CollectionSync {
        pages: remote.pages.clone(),
        enricher: remote.enricher.clone(),
        limits: remote.limits.clone(),
        page_size: options.page_size,
        order_check: options.order_check,
        metadata_refresh: options.metadata_refresh,
        started_at: options.started_at,
    };

    let handles: Vec<(CollectionId, JoinHandle<(Collection, CollectionReport)>)> = metas
        .into_iter()
        .map(|meta| {
            let id = meta.id.clone();
            let sync = sync.clone();
            let stored = prior.get(&id).cloned();
            let handle = tokio::spawn(async move { sync.run(meta, stored.as_ref()).await });
            (id, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        let outcome = handle.await.map_err(|err| format!("sync task failed: {err}"));
        results.push((id, outcome));
    }
    results
}

/// Stored collections that the remote no longer has, in id order.
fn removed_ids(prior: &Snapshot, target: &SyncTarget, resolved: &Resolved) -> Vec<CollectionId> {
    match target {
        SyncTarget::Channel(_) => {
            let listed: HashSet<&CollectionId> = resolved.found.iter().map(|m| &m.id).collect();
            prior
                .iter()
                .map(|c| &c.id)
                .filter(|id| !listed.contains(id))
                .cloned()
                .collect()
        }
        SyncTarget::Playlists(_) => {
            let missing: BTreeSet<CollectionId> = resolved.missing.iter().cloned().collect();
            missing.into_iter().collect()
        }
    }
}

/// Every collection the run would have touched, reported as skipped.
fn skip_all(prior: &Snapshot, target: &SyncTarget, reason: &str) -> Vec<CollectionReport> {
    let ids: Vec<CollectionId> = match target {
        SyncTarget::Channel(_) => prior.iter().map(|c| c.id.clone()).collect(),
        SyncTarget::Playlists(ids) => {
            let unique: BTreeSet<CollectionId> = ids.iter().cloned().collect();
            unique.into_iter().collect()
        }
    };
    ids.into_iter()
        .map(|id| {
            let (title, total) = stored_summary(prior, &id);
            CollectionReport::skipped(id, title, total, reason)
        })
        .collect()
}

fn stored_summary(prior: &Snapshot, id: &CollectionId) -> (String, usize) {
    prior
        .get(id)
        .map(|c| (c.title.clone(), c.items.len()))
        .unwrap_or_default()
}

fn dedup_metas(metas: &mut Vec<CollectionMeta>) {
    let mut seen = HashSet::with_capacity(metas.len());
    metas.retain(|meta| seen.insert(meta.id.clone()));
}
