//! HTTP client for the YouTube Data API v3.
//!
//! One [`YoutubeClient`] is built per run and shared by every collection
//! task. It carries the API key and a pooled `reqwest::Client`; there is no
//! process-wide client state.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use reel_core::{CollectionId, CollectionMeta, Config, ItemDetails, ItemId};
use reel_sync::{Catalog, DetailEnricher, Page, PageSource, SourceError};

use crate::error::YoutubeError;
use crate::wire::{
    self, ChannelResource, ListResponse, PlaylistItemResource, PlaylistResource, VideoResource,
};

/// Most ids (or results) one list request accepts.
const MAX_RESULTS: usize = 50;

#[derive(Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for YoutubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YoutubeClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, YoutubeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(YoutubeError::Client)?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config, api_key: impl Into<String>) -> Result<Self, YoutubeError> {
        Self::new(api_key, config.api_base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, YoutubeError> {
        tracing::debug!(endpoint, ?query, "youtube request");
        let response = self
            .http
            .get(self.url(endpoint))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| YoutubeError::Http { endpoint, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| YoutubeError::Http { endpoint, source })?;
        if !status.is_success() {
            return Err(YoutubeError::Api {
                status: status.as_u16(),
                message: wire::error_message(&body),
            });
        }
        serde_json::from_str(&body).map_err(|source| YoutubeError::Decode { endpoint, source })
    }

    /// Channel id for `handle`. Channel ids (`UC...`) are returned as is.
    pub async fn channel_id(&self, handle: &str) -> Result<String, YoutubeError> {
        let handle = handle.trim();
        if is_channel_id(handle) {
            return Ok(handle.to_string());
        }
        let handle = format!("@{}", handle.trim_start_matches('@'));
        let response: ListResponse<ChannelResource> = self
            .get("channels", &[("part", "id"), ("forHandle", handle.as_str())])
            .await?;
        response
            .items
            .into_iter()
            .next()
            .map(|c| c.id)
            .ok_or_else(|| YoutubeError::NotFound(format!("channel {handle}")))
    }

    /// Every playlist of a channel, following `nextPageToken`.
    pub async fn channel_playlists(
        &self,
        channel_id: &str,
    ) -> Result<Vec<CollectionMeta>, YoutubeError> {
        let max = MAX_RESULTS.to_string();
        let mut playlists = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut query = vec![
                ("part", "snippet,contentDetails"),
                ("channelId", channel_id),
                ("maxResults", max.as_str()),
            ];
            if let Some(token) = token.as_deref() {
                query.push(("pageToken", token));
            }
            let response: ListResponse<PlaylistResource> = self.get("playlists", &query).await?;
            playlists.extend(response.items.into_iter().map(PlaylistResource::into_meta));
            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) if token.as_deref() != Some(next.as_str()) => token = Some(next),
                _ => break,
            }
        }
        tracing::info!(channel_id, playlists = playlists.len(), "channel playlists listed");
        Ok(playlists)
    }

    /// Metadata for `ids`, requested in chunks. Unknown ids are left out.
    pub async fn playlists_by_id(
        &self,
        ids: &[CollectionId],
    ) -> Result<Vec<CollectionMeta>, YoutubeError> {
        let max = MAX_RESULTS.to_string();
        let mut playlists = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_RESULTS) {
            let joined = chunk.iter().map(|id| id.0.as_str()).collect::<Vec<_>>().join(",");
            let response: ListResponse<PlaylistResource> = self
                .get(
                    "playlists",
                    &[
                        ("part", "snippet"),
                        ("id", joined.as_str()),
                        ("maxResults", max.as_str()),
                    ],
                )
                .await?;
            playlists.extend(response.items.into_iter().map(PlaylistResource::into_meta));
        }
        Ok(playlists)
    }

    /// One page of a playlist, newest additions first.
    pub async fn playlist_page(
        &self,
        playlist: &CollectionId,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<Page, YoutubeError> {
        let max = page_size.clamp(1, MAX_RESULTS as u32).to_string();
        let mut query = vec![
            ("part", "snippet,contentDetails"),
            ("playlistId", playlist.0.as_str()),
            ("maxResults", max.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let response: ListResponse<PlaylistItemResource> =
            self.get("playlistItems", &query).await?;

        let listed = response.items.len();
        let items: Vec<_> = response
            .items
            .into_iter()
            .filter_map(PlaylistItemResource::into_remote)
            .collect();
        if items.len() < listed {
            tracing::debug!(
                playlist = %playlist,
                dropped = listed - items.len(),
                "skipped entries without video id or publish time"
            );
        }
        Ok(Page {
            items,
            next_cursor: response.next_page_token,
        })
    }

    /// Duration and counters of one video. `None` when the video is gone.
    pub async fn video_details(&self, video: &ItemId) -> Result<Option<ItemDetails>, YoutubeError> {
        let response: ListResponse<VideoResource> = self
            .get(
                "videos",
                &[("part", "contentDetails,statistics"), ("id", video.0.as_str())],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(VideoResource::into_details))
    }
}

/// `UC` followed by 22 url-safe base64 characters.
fn is_channel_id(value: &str) -> bool {
    value.len() == 24
        && value.starts_with("UC")
        && value[2..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl Catalog for YoutubeClient {
    async fn resolve_channel(&self, handle: &str) -> Result<String, SourceError> {
        Ok(self.channel_id(handle).await?)
    }

    async fn list_collections(&self, channel_id: &str) -> Result<Vec<CollectionMeta>, SourceError> {
        Ok(self.channel_playlists(channel_id).await?)
    }

    async fn describe_collections(
        &self,
        ids: &[CollectionId],
    ) -> Result<Vec<CollectionMeta>, SourceError> {
        Ok(self.playlists_by_id(ids).await?)
    }
}

#[async_trait]
impl PageSource for YoutubeClient {
    async fn fetch_page(
        &self,
        collection: &CollectionId,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<Page, SourceError> {
        Ok(self.playlist_page(collection, cursor, page_size).await?)
    }
}

#[async_trait]
impl DetailEnricher for YoutubeClient {
    async fn fetch_details(&self, item: &ItemId) -> Result<Option<ItemDetails>, SourceError> {
        Ok(self.video_details(item).await?)
    }
}
