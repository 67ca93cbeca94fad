//! Cursor-driven walk over a remote collection.
//!
//! [`Pager::next_batch`] issues exactly one page request per call, so the
//! consumer decides page by page whether to continue. A failed request ends
//! the sequence; the error stays available through [`Pager::failure`].
//! A fresh pager with no cursor always starts again from the newest item.

use reel_core::CollectionId;

use crate::error::SourceError;
use crate::limits::RemoteLimits;
use crate::source::{PageSource, RemoteItem};

/// Items of one fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based page number within this walk.
    pub page: usize,
    pub items: Vec<RemoteItem>,
}

pub struct Pager<'a> {
    source: &'a dyn PageSource,
    limits: &'a RemoteLimits,
    collection: CollectionId,
    page_size: u32,
    cursor: Option<String>,
    finished: bool,
    pages_fetched: usize,
    batches: usize,
    failure: Option<SourceError>,
}

impl<'a> Pager<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        limits: &'a RemoteLimits,
        collection: CollectionId,
        page_size: u32,
    ) -> Self {
        Self {
            source,
            limits,
            collection,
            page_size,
            cursor: None,
            finished: false,
            pages_fetched: 0,
            batches: 0,
            failure: None,
        }
    }

    /// Resume from a continuation cursor instead of the newest item.
    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    /// Page requests issued so far, successful or not.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Batches handed to the consumer so far.
    pub fn batches_received(&self) -> usize {
        self.batches
    }

    /// The error that ended the walk early, if any.
    pub fn failure(&self) -> Option<&SourceError> {
        self.failure.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetch the next page. `None` once the source reports no further
    /// cursor, or after a failed request.
    pub async fn next_batch(&mut self) -> Option<Batch> {
        if self.finished {
            return None;
        }
        let cursor = self.cursor.take();
        tracing::debug!(
            collection = %self.collection,
            page = self.pages_fetched + 1,
            cursor = cursor.as_deref().unwrap_or("-"),
            "requesting page"
        );

        let result = self
            .limits
            .call(
                "page fetch",
                self.source
                    .fetch_page(&self.collection, cursor.as_deref(), self.page_size),
            )
            .await;
        self.pages_fetched += 1;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(
                    collection = %self.collection,
                    page = self.pages_fetched,
                    error = %err,
                    "page fetch failed, ending walk"
                );
                self.failure = Some(err);
                self.finished = true;
                return None;
            }
        };

        match page.next_cursor.filter(|c| !c.is_empty()) {
            Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                tracing::warn!(
                    collection = %self.collection,
                    cursor = %next,
                    "source repeated its cursor, ending walk"
                );
                self.finished = true;
            }
            Some(next) => self.cursor = Some(next),
            None => self.finished = true,
        }

        self.batches += 1;
        Some(Batch {
            page: self.pages_fetched,
            items: page.items,
        })
    }
}
