//! OpenAI-compatible client configuration with sensible defaults.
//!
//! The same client type talks to api.openai.com or to any local server that
//! speaks the OpenAI chat/embeddings protocol (llama.cpp, Ollama, vLLM).

use crate::error::{GuideError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a client with the default timeout.
///
/// `api_base` overrides the endpoint; `api_key` overrides `OPENAI_API_KEY`.
pub fn create_client(api_base: Option<&str>, api_key: Option<&str>) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(api_base, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client with a custom timeout.
pub fn create_client_with_timeout(
    api_base: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GuideError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::default();
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
