//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and credentials are available before
//! starting operations that would otherwise fail midway.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::{GuideError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Building needs a YouTube key; yt-dlp only when an extraction model
    /// is configured.
    Build,
    /// Embedding needs a key only for hosted embeddings.
    Embed,
    /// Asking needs a generation endpoint.
    Ask,
    /// Search runs entirely locally.
    Search,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Build => {
            if settings.youtube.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(GuideError::Config(
                    "YouTube API key not set. Pass --api-key or export YOUTUBE_API_KEY".to_string(),
                ));
            }
            if settings.extraction.is_configured() {
                check_tool("yt-dlp")?;
            }
            check_embedding(settings)?;
        }
        Operation::Embed => check_embedding(settings)?,
        Operation::Ask => {
            if settings.generation.api_base.is_none() {
                check_api_key()?;
            }
            check_embedding(settings)?;
        }
        Operation::Search => check_embedding(settings)?,
    }
    Ok(())
}

fn check_embedding(settings: &Settings) -> Result<()> {
    match settings.embedding.provider {
        EmbeddingProvider::OpenAI => check_api_key(),
        EmbeddingProvider::Local => Ok(()),
    }
}

/// Check if an OpenAI API key is configured. Custom `api_base` endpoints
/// (local servers) skip this check.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(GuideError::Config(
            "OPENAI_API_KEY is empty. Set it, or point api_base at a local server".to_string(),
        )),
        Err(_) => Err(GuideError::Config(
            "OPENAI_API_KEY not set. Set it, or point api_base at a local server".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(GuideError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(GuideError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(GuideError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_with_local_embeddings_has_no_requirements() {
        let settings = Settings::default();
        assert!(check(Operation::Search, &settings).is_ok());
        assert!(check(Operation::Embed, &settings).is_ok());
    }

    #[test]
    fn test_ask_against_local_server_needs_no_key() {
        let mut settings = Settings::default();
        settings.generation.api_base = Some("http://localhost:11434/v1".to_string());
        assert!(check(Operation::Ask, &settings).is_ok());
    }

    #[test]
    fn test_build_without_extraction_needs_only_youtube_key() {
        let mut settings = Settings::default();
        assert!(matches!(
            check(Operation::Build, &settings),
            Err(GuideError::Config(_))
        ));

        settings.youtube.api_key = Some("yt-key".to_string());
        assert!(!settings.extraction.is_configured());
        assert!(check(Operation::Build, &settings).is_ok());
    }

    #[test]
    fn test_missing_tool() {
        assert!(matches!(
            check_tool("definitely-not-a-real-tool-xyz"),
            Err(GuideError::ToolNotFound(_))
        ));
    }
}
