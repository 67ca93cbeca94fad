//! Error type for the YouTube client.

use thiserror::Error;

use reel_sync::SourceError;

#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx answer. `message` comes from the API error envelope when the
    /// body has one.
    #[error("YouTube API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not found")]
    NotFound(String),
}

impl From<YoutubeError> for SourceError {
    fn from(err: YoutubeError) -> Self {
        match err {
            YoutubeError::Client(_) | YoutubeError::Http { .. } => {
                SourceError::Transport(err.to_string())
            }
            YoutubeError::Api { status, message } => SourceError::Api { status, message },
            YoutubeError::Decode { .. } => SourceError::Decode(err.to_string()),
            YoutubeError::NotFound(what) => SourceError::NotFound(what),
        }
    }
}
