//! Chat-completion collaborator used for answers and for extraction.
//!
//! The engine is opaque: it receives an ordered list of role-tagged
//! messages plus sampling limits and returns plain text.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single `{role, content}` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A chat request with bounded output.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    /// The common system-then-user shape.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![PromptMessage::system(system), PromptMessage::user(user)],
            temperature: 0.7,
            max_output_tokens: 512,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Trait for text generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Prepare the engine before the first request. Idempotent.
    async fn load(&self) -> Result<()> {
        Ok(())
    }

    /// Run one chat completion and return the reply text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
