//! Error types for Trailguide.

use thiserror::Error;

/// Library-level error type for Trailguide operations.
#[derive(Error, Debug)]
pub enum GuideError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source unavailable for {video_id}: {reason}")]
    SourceUnavailable { video_id: String, reason: String },

    #[error("Extraction output for {video_id} did not match the schema: {reason}")]
    ExtractionParse { video_id: String, reason: String },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session is not ready (state: {0})")]
    NotReady(String),

    #[error("A query is already in flight for this session")]
    Busy,
}

impl GuideError {
    /// Shorthand for a per-video source failure.
    pub fn source_unavailable(video_id: &str, reason: impl std::fmt::Display) -> Self {
        GuideError::SourceUnavailable {
            video_id: video_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a per-video schema mismatch.
    pub fn extraction_parse(video_id: &str, reason: impl std::fmt::Display) -> Self {
        GuideError::ExtractionParse {
            video_id: video_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for Trailguide operations.
pub type Result<T> = std::result::Result<T, GuideError>;
