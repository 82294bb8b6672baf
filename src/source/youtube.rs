//! YouTube Data API catalog and yt-dlp caption transcripts.

use super::{PlaylistInfo, TranscriptSource, VideoCatalog, VideoInfo};
use crate::config::YoutubeSettings;
use crate::error::{GuideError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const PAGE_SIZE: &str = "50";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    id: String,
    snippet: Snippet,
    content_details: PlaylistDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistDetails {
    #[serde(default)]
    item_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    snippet: Snippet,
    content_details: PlaylistItemDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    content_details: ChannelDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

/// Channel catalog backed by the YouTube Data API v3.
pub struct YoutubeCatalog {
    client: reqwest::Client,
    api_key: String,
    channel_id: String,
    delay: Duration,
    api_base: String,
}

impl YoutubeCatalog {
    pub fn new(api_key: &str, channel_id: &str, delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GuideError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            channel_id: channel_id.to_string(),
            delay,
            api_base: API_BASE.to_string(),
        })
    }

    /// Build a catalog from settings. Requires an API key.
    pub fn from_settings(settings: &YoutubeSettings) -> Result<Self> {
        let api_key = settings.api_key.as_deref().ok_or_else(|| {
            GuideError::Config(
                "YouTube API key not set (youtube.api_key or YOUTUBE_API_KEY)".to_string(),
            )
        })?;
        Self::new(
            api_key,
            &settings.channel_id,
            Duration::from_millis(settings.rate_limit_ms),
        )
    }

    /// Point the catalog at a different API root.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<ListResponse<T>> {
        let url = format!("{}/{}", self.api_base, endpoint);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let page = response.json::<ListResponse<T>>().await?;
        debug!("{} returned {} items", endpoint, page.items.len());
        Ok(page)
    }

    /// Follow `pageToken` until exhausted or `limit` items are collected.
    async fn get_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = params.to_vec();
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page = self.get::<T>(endpoint, &query).await?;
            items.extend(page.items);

            if limit.is_some_and(|l| items.len() >= l) {
                break;
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
            tokio::time::sleep(self.delay).await;
        }

        if let Some(l) = limit {
            items.truncate(l);
        }
        Ok(items)
    }

    async fn uploads_playlist_id(&self) -> Result<String> {
        let page = self
            .get::<ChannelResource>(
                "channels",
                &[("part", "contentDetails"), ("id", self.channel_id.as_str())],
            )
            .await?;

        page.items
            .into_iter()
            .next()
            .map(|c| c.content_details.related_playlists.uploads)
            .ok_or_else(|| {
                GuideError::source_unavailable(&self.channel_id, "channel not found")
            })
    }

    /// Videos of one playlist.
    pub async fn list_playlist_videos(
        &self,
        playlist_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<VideoInfo>> {
        let items = self
            .get_all::<PlaylistItemResource>(
                "playlistItems",
                &[
                    ("part", "snippet,contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", PAGE_SIZE),
                ],
                limit,
            )
            .await?;

        Ok(items
            .into_iter()
            .map(|item| VideoInfo {
                video_id: item.content_details.video_id,
                title: item.snippet.title,
                description: item.snippet.description,
                published_at: item.snippet.published_at,
                playlist_id: playlist_id.to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl VideoCatalog for YoutubeCatalog {
    #[instrument(skip(self), fields(channel = %self.channel_id))]
    async fn list_playlists(&self) -> Result<Vec<PlaylistInfo>> {
        let items = self
            .get_all::<PlaylistResource>(
                "playlists",
                &[
                    ("part", "snippet,contentDetails"),
                    ("channelId", self.channel_id.as_str()),
                    ("maxResults", PAGE_SIZE),
                ],
                None,
            )
            .await?;

        Ok(items
            .into_iter()
            .map(|p| PlaylistInfo {
                id: p.id,
                title: p.snippet.title,
                description: p.snippet.description,
                video_count: p.content_details.item_count,
            })
            .collect())
    }

    #[instrument(skip(self), fields(channel = %self.channel_id))]
    async fn list_uploads(&self, limit: usize) -> Result<Vec<VideoInfo>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let uploads = self.uploads_playlist_id().await?;
        self.list_playlist_videos(&uploads, Some(limit)).await
    }
}

/// Transcript source that reads YouTube caption tracks through yt-dlp.
pub struct YtDlpTranscripts {
    client: reqwest::Client,
    language: String,
}

impl YtDlpTranscripts {
    pub fn new(language: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GuideError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            language: language.to_string(),
        })
    }

    async fn video_info(&self, video_id: &str) -> Result<serde_json::Value> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args(["--dump-json", "--skip-download", "--no-warnings", &url])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GuideError::ToolNotFound("yt-dlp".to_string())
                } else {
                    GuideError::source_unavailable(video_id, format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GuideError::source_unavailable(video_id, stderr.trim()));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            GuideError::source_unavailable(video_id, format!("Failed to parse yt-dlp output: {}", e))
        })
    }
}

#[async_trait]
impl TranscriptSource for YtDlpTranscripts {
    #[instrument(skip(self))]
    async fn fetch_transcript(&self, video_id: &str) -> Result<String> {
        let info = self.video_info(video_id).await?;

        let caption_url = select_caption_url(&info, &self.language).ok_or_else(|| {
            GuideError::source_unavailable(
                video_id,
                format!("no '{}' captions available", self.language),
            )
        })?;

        let raw = self
            .client
            .get(&caption_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GuideError::source_unavailable(video_id, e))?
            .text()
            .await
            .map_err(|e| GuideError::source_unavailable(video_id, e))?;

        let text = parse_json3(&raw).map_err(|e| GuideError::source_unavailable(video_id, e))?;
        if text.is_empty() {
            warn!("Captions for {} are empty", video_id);
            return Err(GuideError::source_unavailable(video_id, "empty transcript"));
        }
        Ok(text)
    }
}

/// Pick the `json3` caption URL for `language` from yt-dlp's info JSON.
///
/// Uploaded subtitles win over automatic captions; an exact language code
/// wins over a regional variant such as `en-US`.
pub fn select_caption_url(info: &serde_json::Value, language: &str) -> Option<String> {
    let regional = format!("{}-", language);

    for key in ["subtitles", "automatic_captions"] {
        let Some(tracks) = info[key].as_object() else {
            continue;
        };

        let mut candidates: Vec<&String> = tracks
            .keys()
            .filter(|code| *code == language || code.starts_with(&regional))
            .collect();
        candidates.sort_by(|a, b| {
            (a.as_str() != language)
                .cmp(&(b.as_str() != language))
                .then_with(|| a.cmp(b))
        });

        for code in candidates {
            let url = tracks[code.as_str()]
                .as_array()
                .into_iter()
                .flatten()
                .find(|format| format["ext"] == "json3")
                .and_then(|format| format["url"].as_str());
            if let Some(url) = url {
                return Some(url.to_string());
            }
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Flatten a `json3` caption document into plain text, one space between
/// caption segments.
pub fn parse_json3(raw: &str) -> Result<String> {
    let doc: Json3 = serde_json::from_str(raw)?;

    let text = doc
        .events
        .iter()
        .map(|event| event.segs.iter().map(|s| s.utf8.as_str()).collect::<String>())
        .flat_map(|line| {
            line.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join(" ");

    Ok(text)
}
