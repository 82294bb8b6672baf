//! Configuration settings for Trailguide.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub youtube: YoutubeSettings,
    pub extraction: ExtractionSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub retrieval: RetrievalSettings,
    pub knowledge_base: KnowledgeBaseSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.trailguide".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// YouTube-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// YouTube Data API key.
    pub api_key: Option<String>,
    /// Channel to scrape.
    pub channel_id: String,
    /// Display name recorded in the artifact metadata.
    pub channel_name: Option<String>,
    /// Delay between API calls in milliseconds.
    pub rate_limit_ms: u64,
    /// Maximum number of uploads to process per build.
    pub max_videos: usize,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            channel_id: "UCXCbmqLdPscHPhFL7gqPOhQ".to_string(),
            channel_name: Some("Outdoor Boys".to_string()),
            rate_limit_ms: 500,
            max_videos: 10,
        }
    }
}

/// Settings for LLM-based fact extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Chat model used to turn transcripts into structured JSON.
    pub model: String,
    /// OpenAI-compatible base URL (None = api.openai.com).
    pub api_base: Option<String>,
    /// API key for the extraction endpoint (also `OPENAI_API_KEY`).
    pub api_key: Option<String>,
    /// Transcript characters sent to the model; the tail is dropped.
    pub max_transcript_chars: usize,
    /// Description characters included in the extraction prompt.
    pub max_description_chars: usize,
    /// Output token limit for transcript extraction.
    pub max_tokens: u32,
    /// Output token limit for description business extraction.
    pub business_max_tokens: u32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key: None,
            max_transcript_chars: 15_000,
            max_description_chars: 500,
            max_tokens: 4096,
            business_max_tokens: 1000,
        }
    }
}

impl ExtractionSettings {
    /// Whether an extraction model can be reached: either a custom endpoint
    /// or a non-empty key for the hosted API.
    pub fn is_configured(&self) -> bool {
        self.api_base.is_some() || self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Sentence-transformer model run in-process.
    #[default]
    Local,
    /// OpenAI embeddings API.
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fastembed" => Ok(EmbeddingProvider::Local),
            "openai" => Ok(EmbeddingProvider::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Local => write!(f, "local"),
            EmbeddingProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Embedding generation settings.
///
/// The artifact and every runtime query must use the same provider, model
/// and dimensions, otherwise similarity scores are meaningless.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model: "all-minilm-l6-v2".to_string(),
            dimensions: 384,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Chat model used for answers.
    pub model: String,
    /// OpenAI-compatible base URL, e.g. a local llama.cpp or Ollama server.
    pub api_base: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            temperature: 0.7,
            max_output_tokens: 512,
        }
    }
}

/// Retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Hits passed to the model as context.
    pub top_k: usize,
    /// Weight of vector similarity: `score = (1-α)*keyword + α*vector`.
    pub hybrid_alpha: f64,
    /// Keyword candidates fetched before blending.
    pub keyword_candidates: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            hybrid_alpha: 0.5,
            keyword_candidates: 50,
        }
    }
}

/// Location of the knowledge base artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    /// A `.json` file or a split directory.
    pub path: String,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            path: "~/.trailguide/knowledge-base.json".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GuideError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trailguide")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded knowledge base path.
    pub fn knowledge_base_path(&self) -> PathBuf {
        Self::expand_path(&self.knowledge_base.path)
    }

    /// Set a single value by dotted key (e.g. `retrieval.top_k`).
    ///
    /// The value is parsed as TOML where possible, so numbers and booleans
    /// keep their types; anything else is stored as a string.
    pub fn set_value(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        let (section, field) = key.split_once('.').ok_or_else(|| {
            crate::error::GuideError::Config(format!(
                "Key must be of the form section.field, got '{}'",
                key
            ))
        })?;

        let mut doc = toml::Value::try_from(&*self)
            .map_err(|e| crate::error::GuideError::Config(e.to_string()))?;

        let table = doc
            .get_mut(section)
            .and_then(|s| s.as_table_mut())
            .ok_or_else(|| {
                crate::error::GuideError::Config(format!("Unknown section '{}'", section))
            })?;

        let parsed = format!("v = {}", value)
            .parse::<toml::Table>()
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(value.to_string()));
        table.insert(field.to_string(), parsed);

        *self = doc
            .try_into()
            .map_err(|e: toml::de::Error| crate::error::GuideError::Config(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_runtime_contract() {
        let settings = Settings::default();
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.embedding.dimensions, 384);
        assert_eq!(settings.extraction.max_transcript_chars, 15_000);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Local);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            top_k = 3

            [generation]
            api_base = "http://localhost:11434/v1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.retrieval.hybrid_alpha, 0.5);
        assert_eq!(
            settings.generation.api_base.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(settings.generation.max_output_tokens, 512);
    }

    #[test]
    fn test_set_value() {
        let mut settings = Settings::default();
        settings.set_value("retrieval.top_k", "8").unwrap();
        settings.set_value("generation.model", "llama3.2").unwrap();
        settings.set_value("embedding.provider", "openai").unwrap();

        assert_eq!(settings.retrieval.top_k, 8);
        assert_eq!(settings.generation.model, "llama3.2");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::OpenAI);

        assert!(settings.set_value("nosection", "1").is_err());
        assert!(settings.set_value("bogus.field", "1").is_err());
    }

    #[test]
    fn test_extraction_is_optional() {
        let mut extraction = ExtractionSettings::default();
        assert!(!extraction.is_configured());

        extraction.api_key = Some(String::new());
        assert!(!extraction.is_configured());

        extraction.api_key = Some("sk-test".to_string());
        assert!(extraction.is_configured());

        let local = ExtractionSettings {
            api_base: Some("http://localhost:8080/v1".to_string()),
            ..ExtractionSettings::default()
        };
        assert!(local.is_configured());
    }

    #[test]
    fn test_channel_name_setting() {
        let mut settings = Settings::default();
        assert_eq!(settings.youtube.channel_name.as_deref(), Some("Outdoor Boys"));

        settings.set_value("youtube.channel_name", "Cabin Crew").unwrap();
        assert_eq!(settings.youtube.channel_name.as_deref(), Some("Cabin Crew"));
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("fastembed".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::Local);
        assert!("cohere".parse::<EmbeddingProvider>().is_err());
    }
}
