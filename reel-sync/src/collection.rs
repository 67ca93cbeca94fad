//! Sync of a single collection: pager + merge engine + metadata policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use reel_core::{Collection, CollectionMeta, MetadataRefresh, OrderCheck};

use crate::limits::RemoteLimits;
use crate::merge::{self, MergeOutcome};
use crate::pager::Pager;
use crate::report::{CollectionReport, CollectionStatus};
use crate::source::{DetailEnricher, PageSource};

/// Everything a collection task needs. Cheap to clone: one per task.
#[derive(Clone)]
pub struct CollectionSync {
    pub pages: Arc<dyn PageSource>,
    pub enricher: Arc<dyn DetailEnricher>,
    pub limits: RemoteLimits,
    pub page_size: u32,
    pub order_check: OrderCheck,
    pub metadata_refresh: MetadataRefresh,
    /// Stamped into `last_updated` of every collection this run touches.
    pub started_at: DateTime<Utc>,
}

impl CollectionSync {
    /// Bring one collection up to date. Never fails; see [`CollectionStatus`].
    pub async fn run(
        &self,
        meta: CollectionMeta,
        prior: Option<&Collection>,
    ) -> (Collection, CollectionReport) {
        let prior_items = prior.map(|c| c.items.as_slice()).unwrap_or(&[]);
        let mut pager = Pager::new(
            self.pages.as_ref(),
            &self.limits,
            meta.id.clone(),
            self.page_size,
        );
        let outcome = merge::merge(
            &meta,
            prior_items,
            &mut pager,
            self.enricher.as_ref(),
            &self.limits,
            self.order_check,
        )
        .await;

        let meta = self.pick_meta(meta, prior, &outcome);
        let report = build_report(&meta, &outcome);
        log_outcome(&report);

        let collection = Collection::from_parts(
            meta,
            outcome.items,
            self.started_at,
            outcome.error_note,
        );
        (collection, report)
    }

    fn pick_meta(
        &self,
        fresh: CollectionMeta,
        prior: Option<&Collection>,
        outcome: &MergeOutcome,
    ) -> CollectionMeta {
        match (self.metadata_refresh, prior) {
            (MetadataRefresh::WhenChanged, Some(prior)) if outcome.stats.new_items == 0 => {
                prior.meta()
            }
            _ => fresh,
        }
    }
}

fn build_report(meta: &CollectionMeta, outcome: &MergeOutcome) -> CollectionReport {
    let status = match (&outcome.error_note, outcome.degraded) {
        (Some(note), true) => CollectionStatus::Degraded { note: note.clone() },
        (None, true) => CollectionStatus::Degraded {
            note: "incomplete sync".to_string(),
        },
        _ => CollectionStatus::Synced,
    };
    CollectionReport {
        id: meta.id.clone(),
        title: meta.title.clone(),
        status,
        mode: Some(outcome.mode),
        new_items: outcome.stats.new_items,
        total_items: outcome.items.len(),
        pages_fetched: outcome.stats.pages_fetched,
        enrichment_failures: outcome.stats.enrichment_failures,
        stopped_early: outcome.stats.stopped_early,
        order_violation: outcome.stats.order_violation,
    }
}

fn log_outcome(report: &CollectionReport) {
    match &report.status {
        CollectionStatus::Degraded { note } => tracing::warn!(
            collection = %report.id,
            new_items = report.new_items,
            total = report.total_items,
            pages = report.pages_fetched,
            note = %note,
            "collection degraded"
        ),
        _ => tracing::info!(
            collection = %report.id,
            mode = ?report.mode,
            new_items = report.new_items,
            total = report.total_items,
            pages = report.pages_fetched,
            "collection synced"
        ),
    }
}
