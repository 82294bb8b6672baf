//! Prompt templates for Trailguide.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub extraction: ExtractionPrompts,
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for turning transcripts and descriptions into structured records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPrompts {
    pub system: String,
    pub user: String,
    pub business: String,
}

impl Default for ExtractionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You extract structured knowledge from outdoor adventure video transcripts.
Only include items that are clearly mentioned. Be specific and detailed.
Respond with valid JSON only, no other text."#
                .to_string(),

            user: r#"Analyze this YouTube video transcript and extract structured information.

Video Title: {{title}}
Video Description: {{description}}

Transcript (first {{max_chars}} chars):
{{transcript}}

Extract the following into valid JSON:
{
    "survival_tips": ["specific actionable tip"],
    "building_techniques": ["technique with detail"],
    "life_lessons": ["wisdom or philosophy shared"],
    "dad_jokes": ["any jokes told"],
    "fishing_tips": ["specific fishing advice"],
    "recipes": [{"name": "dish name", "ingredients": ["ing1"], "steps": ["step1"], "cooking_method": "campfire|grill|indoor"}],
    "gear_mentioned": [{"name": "item name", "use": "what it's for", "recommendation": "why recommended"}],
    "locations_visited": ["place name"],
    "businesses_mentioned": [{"name": "business name", "type": "charter|restaurant|store|lodge|guide", "location": "city, state", "contact": "if mentioned"}]
}

Return ONLY valid JSON, no other text."#
                .to_string(),

            business: r#"Extract any businesses, services, or locations mentioned in this YouTube video description:

{{description}}

Look for:
- Charter services (fishing, hunting guides)
- Restaurants and lodges
- Equipment stores and brands with links
- Specific locations with contact info

Return as JSON array:
[{"name": "", "type": "charter|restaurant|store|lodge|guide|other", "location": "", "website": "", "contact": ""}]

Return ONLY a valid JSON array, no other text. Return [] if no businesses are found."#
                .to_string(),
        }
    }
}

/// Prompts for RAG response generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are Trailguide, a friendly, down-to-earth outdoor companion who has watched every episode of the channel.

Guidelines:
- Answer using only the facts in the provided context
- If the context does not cover the question, say you don't know rather than guessing
- Keep it practical and upbeat, like advice shared around a campfire
- A well-placed dad joke is welcome when one appears in the context
- Never invent gear, businesses, or safety advice that is not in the context"#
                .to_string(),

            user: r#"Context from the knowledge base:

{{context}}

Question: {{question}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let extraction_path = custom_path.join("extraction.toml");
            if extraction_path.exists() {
                let content = std::fs::read_to_string(&extraction_path)?;
                prompts.extraction = toml::from_str(&content)?;
            }

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in one pass, so substituted values are never
    /// expanded again. Unknown placeholders are left as written.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &regex::Captures<'_>| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"))
}
