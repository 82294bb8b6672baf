//! Video collaborators for the knowledge builder.
//!
//! A [`VideoCatalog`] lists a channel's playlists and uploads; a
//! [`TranscriptSource`] fetches the spoken text of one video. Both are
//! traits so the builder can run against fakes in tests.

mod youtube;

pub use youtube::{parse_json3, select_caption_url, YoutubeCatalog, YtDlpTranscripts};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A channel playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_count: u32,
}

/// A video listed in a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<String>,
    pub playlist_id: String,
}

impl VideoInfo {
    /// Watch URL for this video.
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

/// Lists what a channel has published.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Every playlist of the channel, in API order.
    async fn list_playlists(&self) -> Result<Vec<PlaylistInfo>>;

    /// Up to `limit` videos from the channel's uploads, newest first.
    async fn list_uploads(&self, limit: usize) -> Result<Vec<VideoInfo>>;
}

/// Fetches transcripts.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Full transcript text of a video. Failures are `SourceUnavailable`.
    async fn fetch_transcript(&self, video_id: &str) -> Result<String>;
}
