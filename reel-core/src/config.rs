//! Run configuration.
//!
//! Read from a YAML file (default `reel.yaml`), then overridden by the
//! environment. A missing file is not an error; every field has a default.
//!
//! ```yaml
//! channel: "@damaikasihchannel9153"
//! snapshot_path: playlists.json
//! page_size: 50
//! max_concurrent_requests: 4
//! request_timeout_secs: 30
//! metadata_refresh: always      # always | when_changed
//! order_check: verify           # verify | trust
//! prune_removed: false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::CollectionId;

pub const DEFAULT_CONFIG_FILE: &str = "reel.yaml";
pub const DEFAULT_SNAPSHOT_FILE: &str = "playlists.json";
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Largest page the remote API will return.
pub const MAX_PAGE_SIZE: u32 = 50;
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_CHANNEL: &str = "REEL_CHANNEL";
pub const ENV_CHANNEL_ID: &str = "CHANNEL_ID";
pub const ENV_SNAPSHOT: &str = "REEL_SNAPSHOT";

/// Whether collection metadata is refreshed when a sync finds nothing new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataRefresh {
    #[default]
    Always,
    /// Keep the stored title/description unless new items arrived.
    WhenChanged,
}

/// How far the newest-first ordering of the remote source is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderCheck {
    /// Watch `published_at` while paging; on a violation stop relying on
    /// early-stop and scan the rest of the collection.
    #[default]
    Verify,
    /// Stop at the first known item unconditionally.
    Trust,
}

/// What a run synchronizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    /// Every playlist of a channel (handle such as `@name`, or a channel id).
    Channel(String),
    /// An explicit list of playlists.
    Playlists(Vec<CollectionId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub playlists: Vec<String>,
    pub snapshot_path: PathBuf,
    pub page_size: u32,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
    pub metadata_refresh: MetadataRefresh,
    pub order_check: OrderCheck,
    pub prune_removed: bool,
    pub api_base_url: String,
    /// Accepted from the file for convenience, never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: None,
            playlists: Vec::new(),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            page_size: MAX_PAGE_SIZE,
            max_concurrent_requests: DEFAULT_CONCURRENCY,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            metadata_refresh: MetadataRefresh::default(),
            order_check: OrderCheck::default(),
            prune_removed: false,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load `path`; a missing file yields the defaults.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(channel) = get(ENV_CHANNEL).or_else(|| get(ENV_CHANNEL_ID)) {
            self.channel = Some(channel);
        }
        if let Some(path) = get(ENV_SNAPSHOT) {
            self.snapshot_path = PathBuf::from(path);
        }
    }

    /// Clamp numeric settings into range and check that the run can start.
    ///
    /// Returns the API key on success.
    pub fn validate(&mut self) -> Result<String, ConfigError> {
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.max_concurrent_requests = self.max_concurrent_requests.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.playlists.retain(|id| !id.trim().is_empty());

        let key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        if self.target().is_none() {
            return Err(ConfigError::MissingTarget);
        }
        Ok(key)
    }

    /// Explicit playlists win over the channel.
    pub fn target(&self) -> Option<SyncTarget> {
        if !self.playlists.is_empty() {
            return Some(SyncTarget::Playlists(
                self.playlists.iter().map(|p| CollectionId::from(p.as_str())).collect(),
            ));
        }
        self.channel
            .as_ref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| SyncTarget::Channel(c.clone()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Starter config written by `reel init`.
    pub fn template() -> String {
        let defaults = Self::default();
        format!(
            "# reel configuration\n\
             #\n\
             # The API key is read from YOUTUBE_API_KEY (or a .env file).\n\
             \n\
             # Channel handle (\"@name\") or channel id; every playlist is synced.\n\
             channel: \"\"\n\
             \n\
             # Or list playlist ids explicitly (takes precedence over channel).\n\
             # playlists:\n\
             #   - PLxxxxxxxxxxxxxxxx\n\
             \n\
             snapshot_path: {snapshot}\n\
             page_size: {page}\n\
             max_concurrent_requests: {conc}\n\
             request_timeout_secs: {timeout}\n\
             \n\
             # always | when_changed\n\
             metadata_refresh: always\n\
             \n\
             # verify | trust\n\
             order_check: verify\n\
             \n\
             # Drop stored playlists that no longer exist remotely.\n\
             prune_removed: false\n",
            snapshot = defaults.snapshot_path.display(),
            page = defaults.page_size,
            conc = defaults.max_concurrent_requests,
            timeout = defaults.request_timeout_secs,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
