//! YouTube Data API v3 backend for reel.
//!
//! [`YoutubeClient`] implements [`reel_sync::Catalog`],
//! [`reel_sync::PageSource`] and [`reel_sync::DetailEnricher`]: playlists
//! are collections, videos are items.

mod client;
mod error;
mod wire;

pub use client::YoutubeClient;
pub use error::YoutubeError;
