//! Response shapes of the YouTube Data API v3, and their mapping to domain
//! types. Only the fields the sync uses are declared.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use reel_core::{CollectionId, CollectionMeta, ItemDetails, ItemId};
use reel_sync::RemoteItem;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelResource {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Thumbnails {
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    #[serde(rename = "default")]
    pub fallback: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnail {
    pub url: String,
}

impl Thumbnails {
    /// Medium size, as the site renders it; other sizes as fallback.
    fn best_url(self) -> Option<String> {
        self.medium
            .or(self.high)
            .or(self.fallback)
            .map(|t| t.url)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistResource {
    pub id: String,
    #[serde(default)]
    pub snippet: Snippet,
}

impl PlaylistResource {
    pub fn into_meta(self) -> CollectionMeta {
        CollectionMeta {
            id: CollectionId(self.id),
            title: self.snippet.title,
            description: self.snippet.description,
            thumbnail_url: self.snippet.thumbnails.best_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemResource {
    #[serde(default)]
    pub snippet: Snippet,
    #[serde(default)]
    pub content_details: Option<PlaylistItemDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemDetails {
    pub video_id: Option<String>,
}

impl PlaylistItemResource {
    /// `None` for entries without a video id or publish time (removed
    /// videos show up like this).
    pub fn into_remote(self) -> Option<RemoteItem> {
        let video_id = self.content_details?.video_id.filter(|id| !id.is_empty())?;
        let published_at = self.snippet.published_at?;
        Some(RemoteItem {
            id: ItemId(video_id),
            title: self.snippet.title,
            description: self.snippet.description,
            thumbnail_url: self.snippet.thumbnails.best_url(),
            published_at,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoResource {
    #[serde(default)]
    pub content_details: Option<VideoContentDetails>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoContentDetails {
    pub duration: Option<String>,
}

/// Counters arrive as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Statistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
    pub favorite_count: Option<String>,
}

fn count(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse().ok())
}

impl VideoResource {
    /// `None` when the API returned neither duration nor any counter.
    pub fn into_details(self) -> Option<ItemDetails> {
        let stats = self.statistics.unwrap_or_default();
        let details = ItemDetails {
            duration: self.content_details.and_then(|c| c.duration),
            view_count: count(stats.view_count),
            like_count: count(stats.like_count),
            comment_count: count(stats.comment_count),
            favorite_count: count(stats.favorite_count),
        };
        (!details.is_empty()).then_some(details)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorReason>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorReason {
    #[serde(default)]
    pub reason: String,
}

/// Human-readable message for an error body: `reason: message` from the
/// envelope, or the raw body when it is not an envelope.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .errors
                .first()
                .map(|r| r.reason.as_str())
                .filter(|r| !r.is_empty());
            match reason {
                Some(reason) => format!("{reason}: {}", envelope.error.message),
                None => envelope.error.message,
            }
        }
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        }
    }
}
