//! Deterministic collaborators for unit tests.

use crate::embedding::{normalize, Embedder};
use crate::error::{GuideError, Result};
use crate::generation::{GenerationRequest, Generator};
use crate::source::{PlaylistInfo, TranscriptSource, VideoCatalog, VideoInfo};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

const BUCKETS: &[&[&str]] = &[
    &["snow", "shelter", "trench", "igloo", "winter", "cold"],
    &["fish", "halibut", "salmon", "bait", "herring"],
    &["cabin", "log", "build", "roof", "frame"],
    &["fire", "match", "tinder", "spark"],
    &["cook", "recipe", "chili", "bannock", "smoke"],
    &["gear", "saw", "knife", "spray", "boot"],
    &["joke", "laugh", "pun"],
];

/// Embeds text by counting keyword hits per topic bucket, plus a constant
/// bias component so no vector is zero.
pub struct KeywordEmbedder {
    loaded: AtomicBool,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub const DIMENSIONS: usize = 8;

    pub fn new() -> Self {
        Self {
            loaded: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut vector: Vec<f32> = BUCKETS
            .iter()
            .map(|words| words.iter().filter(|w| text.contains(*w)).count() as f32)
            .collect();
        vector.push(0.1);
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn load(&self) -> Result<()> {
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.loaded.store(true, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.loaded.store(true, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "keyword-buckets"
    }
}

/// Embedder whose model never loads.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn load(&self) -> Result<()> {
        Err(GuideError::Embedding("model download failed".to_string()))
    }

    fn is_loaded(&self) -> bool {
        false
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(GuideError::Embedding("model download failed".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(GuideError::Embedding("model download failed".to_string()))
    }

    fn dimensions(&self) -> usize {
        KeywordEmbedder::DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Embedder that loads fine but fails every request.
pub struct BrokenQueryEmbedder;

#[async_trait]
impl Embedder for BrokenQueryEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(GuideError::Embedding("inference session crashed".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(GuideError::Embedding("inference session crashed".to_string()))
    }

    fn dimensions(&self) -> usize {
        KeywordEmbedder::DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "broken"
    }
}

/// Replays canned replies in order and records every request.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GuideError::Generation("no scripted reply left".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Generator that always fails.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        Err(GuideError::Generation("engine crashed".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// In-memory channel catalog.
pub struct FakeCatalog {
    playlists: Vec<PlaylistInfo>,
    videos: Vec<VideoInfo>,
}

impl FakeCatalog {
    pub fn new(playlists: Vec<PlaylistInfo>, videos: Vec<VideoInfo>) -> Self {
        Self { playlists, videos }
    }
}

#[async_trait]
impl VideoCatalog for FakeCatalog {
    async fn list_playlists(&self) -> Result<Vec<PlaylistInfo>> {
        Ok(self.playlists.clone())
    }

    async fn list_uploads(&self, limit: usize) -> Result<Vec<VideoInfo>> {
        Ok(self.videos.iter().take(limit).cloned().collect())
    }
}

/// Transcripts keyed by video id; unknown ids are unavailable.
#[derive(Default)]
pub struct FakeTranscripts {
    transcripts: HashMap<String, String>,
}

impl FakeTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, video_id: &str, transcript: &str) -> Self {
        self.transcripts
            .insert(video_id.to_string(), transcript.to_string());
        self
    }
}

#[async_trait]
impl TranscriptSource for FakeTranscripts {
    async fn fetch_transcript(&self, video_id: &str) -> Result<String> {
        self.transcripts
            .get(video_id)
            .cloned()
            .ok_or_else(|| GuideError::source_unavailable(video_id, "transcripts are disabled"))
    }
}
