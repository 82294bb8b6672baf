//! Configuration module for Trailguide.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ExtractionPrompts, Prompts, RagPrompts};
pub use settings::{
    EmbeddingProvider, EmbeddingSettings, ExtractionSettings, GeneralSettings,
    GenerationSettings, KnowledgeBaseSettings, PromptSettings, RetrievalSettings, Settings,
    YoutubeSettings,
};
