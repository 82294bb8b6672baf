//! Structured extraction from video transcripts.
//!
//! A chat model is asked for a JSON object describing what a video teaches.
//! The reply is decoded against [`VideoExtraction`]; anything that does not
//! match becomes [`GuideError::ExtractionParse`] for that video.

mod builder;
pub mod category;

pub use builder::{
    embed_knowledge_base, BuildFailure, BuildReport, KnowledgeAccumulator, KnowledgeBuilder,
};
pub use category::{infer_category, DEFAULT_CATEGORY};

use crate::config::{ExtractionSettings, Prompts};
use crate::error::{GuideError, Result};
use crate::generation::{GenerationRequest, Generator};
use crate::source::VideoInfo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Everything extracted from one video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoExtraction {
    pub survival_tips: Vec<String>,
    pub building_techniques: Vec<String>,
    pub life_lessons: Vec<String>,
    pub dad_jokes: Vec<String>,
    pub fishing_tips: Vec<String>,
    pub recipes: Vec<RecipeEntry>,
    #[serde(alias = "gear_recommendations")]
    pub gear_mentioned: Vec<GearEntry>,
    pub locations_visited: Vec<String>,
    pub businesses_mentioned: Vec<BusinessEntry>,
}

impl VideoExtraction {
    /// Number of items across all lists.
    pub fn item_count(&self) -> usize {
        self.survival_tips.len()
            + self.building_techniques.len()
            + self.life_lessons.len()
            + self.dad_jokes.len()
            + self.fishing_tips.len()
            + self.recipes.len()
            + self.gear_mentioned.len()
            + self.locations_visited.len()
            + self.businesses_mentioned.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeEntry {
    pub name: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub cooking_method: Option<String>,
}

impl RecipeEntry {
    pub fn content(&self) -> String {
        let name = if self.name.trim().is_empty() {
            "Unknown recipe"
        } else {
            self.name.trim()
        };
        let mut content = format!(
            "{}: ingredients {}; steps {}",
            name,
            self.ingredients.join(", "),
            self.steps.join(" ")
        );
        if let Some(method) = self.cooking_method.as_deref().filter(|m| !m.is_empty()) {
            content.push_str(&format!(" (cooked {})", method));
        }
        content
    }
}

/// Gear is reported either as a bare string or as a structured item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GearEntry {
    Text(String),
    Item {
        #[serde(default)]
        name: String,
        #[serde(default, rename = "use")]
        purpose: String,
        #[serde(default)]
        recommendation: String,
    },
}

impl GearEntry {
    pub fn content(&self) -> String {
        match self {
            GearEntry::Text(text) => text.clone(),
            GearEntry::Item {
                name,
                purpose,
                recommendation,
            } => {
                let name = if name.is_empty() { "Unknown" } else { name };
                format!("{}: {} - {}", name, purpose, recommendation)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_business_kind", rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

fn default_business_kind() -> String {
    "other".to_string()
}

/// Slice the outermost `open ... close` span out of a model reply.
fn json_span(reply: &str, open: char, close: char) -> Option<&str> {
    let start = reply.find(open)?;
    let end = reply.rfind(close)?;
    (end > start).then(|| &reply[start..=end])
}

fn decode<T: DeserializeOwned>(video_id: &str, reply: &str, open: char, close: char) -> Result<T> {
    let json = json_span(reply, open, close).ok_or_else(|| {
        GuideError::extraction_parse(video_id, format!("no JSON {}...{} in reply", open, close))
    })?;
    serde_json::from_str(json).map_err(|e| GuideError::extraction_parse(video_id, e))
}

/// Decode a transcript extraction reply. Prose or code fences around the
/// JSON object are ignored.
pub fn parse_extraction(video_id: &str, reply: &str) -> Result<VideoExtraction> {
    decode(video_id, reply, '{', '}')
}

/// Decode a business-list reply (a JSON array).
pub fn parse_business_list(video_id: &str, reply: &str) -> Result<Vec<BusinessEntry>> {
    decode(video_id, reply, '[', ']')
}

/// Keep at most `max_chars` characters, cutting on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Runs the extraction prompts against a chat model.
pub struct Extractor {
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    settings: ExtractionSettings,
}

impl Extractor {
    pub fn new(generator: Arc<dyn Generator>, prompts: Prompts, settings: ExtractionSettings) -> Self {
        Self {
            generator,
            prompts,
            settings,
        }
    }

    /// Build the transcript extraction request for a video.
    pub fn extraction_request(&self, video: &VideoInfo, transcript: &str) -> GenerationRequest {
        let mut vars = HashMap::new();
        vars.insert("title".to_string(), video.title.clone());
        vars.insert(
            "description".to_string(),
            truncate_chars(&video.description, self.settings.max_description_chars).to_string(),
        );
        vars.insert(
            "max_chars".to_string(),
            self.settings.max_transcript_chars.to_string(),
        );
        vars.insert(
            "transcript".to_string(),
            truncate_chars(transcript, self.settings.max_transcript_chars).to_string(),
        );

        let system = self
            .prompts
            .render_with_custom(&self.prompts.extraction.system, &HashMap::new());
        let user = self
            .prompts
            .render_with_custom(&self.prompts.extraction.user, &vars);

        GenerationRequest::new(system, user)
            .with_temperature(0.0)
            .with_max_output_tokens(self.settings.max_tokens)
    }

    /// Build the description business-extraction request.
    pub fn business_request(&self, description: &str) -> GenerationRequest {
        let mut vars = HashMap::new();
        vars.insert("description".to_string(), description.to_string());

        let user = self
            .prompts
            .render_with_custom(&self.prompts.extraction.business, &vars);
        let system = self
            .prompts
            .render_with_custom(&self.prompts.extraction.system, &HashMap::new());

        GenerationRequest::new(system, user)
            .with_temperature(0.0)
            .with_max_output_tokens(self.settings.business_max_tokens)
    }

    /// Extract structured records from a video's transcript.
    #[instrument(skip(self, video, transcript), fields(video_id = %video.video_id))]
    pub async fn extract(&self, video: &VideoInfo, transcript: &str) -> Result<VideoExtraction> {
        let request = self.extraction_request(video, transcript);
        let reply = self.generator.generate(&request).await?;
        let extraction = parse_extraction(&video.video_id, &reply)?;
        debug!("Extracted {} items", extraction.item_count());
        Ok(extraction)
    }

    /// Extract businesses from a video's description. Empty descriptions
    /// short-circuit to no businesses.
    #[instrument(skip(self, video), fields(video_id = %video.video_id))]
    pub async fn extract_businesses(&self, video: &VideoInfo) -> Result<Vec<BusinessEntry>> {
        if video.description.trim().is_empty() {
            return Ok(Vec::new());
        }
        let request = self.business_request(&video.description);
        let reply = self.generator.generate(&request).await?;
        parse_business_list(&video.video_id, &reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    fn video() -> VideoInfo {
        VideoInfo {
            video_id: "vid1".to_string(),
            title: "Winter Camping in a Snow Trench".to_string(),
            description: "d".repeat(900),
            published_at: None,
            playlist_id: "UU1".to_string(),
        }
    }

    #[test]
    fn test_parse_full_schema() {
        let reply = r#"Here you go:
```json
{
  "survival_tips": ["Dig a snow trench 2 feet deep"],
  "building_techniques": [],
  "life_lessons": ["Hard work pays off"],
  "dad_jokes": ["I'm reading a book on anti-gravity. It's impossible to put down."],
  "fishing_tips": ["Use herring for halibut"],
  "recipes": [{"name": "Campfire chili", "ingredients": ["beans"], "steps": ["simmer"], "cooking_method": "campfire"}],
  "gear_recommendations": ["Folding saw", {"name": "Bear spray", "use": "defense", "recommendation": "always carry"}],
  "locations_visited": ["Homer, Alaska"],
  "businesses_mentioned": [{"name": "Homer Charters", "type": "charter", "location": "Homer, AK"}]
}
```"#;
        let extraction = parse_extraction("vid1", reply).unwrap();
        assert_eq!(extraction.survival_tips.len(), 1);
        assert_eq!(extraction.gear_mentioned.len(), 2);
        assert_eq!(extraction.gear_mentioned[0].content(), "Folding saw");
        assert_eq!(
            extraction.gear_mentioned[1].content(),
            "Bear spray: defense - always carry"
        );
        assert_eq!(extraction.businesses_mentioned[0].kind, "charter");
        assert_eq!(extraction.businesses_mentioned[0].contact, None);
        assert_eq!(extraction.item_count(), 9);
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let extraction = parse_extraction("vid1", r#"{"dad_jokes": ["knock knock"]}"#).unwrap();
        assert_eq!(extraction.dad_jokes, vec!["knock knock"]);
        assert!(extraction.survival_tips.is_empty());
        assert!(extraction.recipes.is_empty());
    }

    #[test]
    fn test_malformed_reply_is_a_parse_failure() {
        for reply in [
            "I could not find anything useful.",
            r#"{"survival_tips": "not a list"}"#,
            r#"{"survival_tips": ["ok"],"#,
            "} backwards {",
        ] {
            match parse_extraction("vid9", reply) {
                Err(GuideError::ExtractionParse { video_id, .. }) => assert_eq!(video_id, "vid9"),
                other => panic!("expected ExtractionParse for {:?}, got {:?}", reply, other),
            }
        }
    }

    #[test]
    fn test_parse_business_list() {
        let businesses = parse_business_list(
            "vid1",
            r#"Sure! [{"name": "Kenai Lodge", "type": "lodge", "website": "https://kenai.example"}]"#,
        )
        .unwrap();
        assert_eq!(businesses.len(), 1);
        assert_eq!(businesses[0].website.as_deref(), Some("https://kenai.example"));
        assert_eq!(businesses[0].location, "");

        assert!(parse_business_list("vid1", "[]").unwrap().is_empty());
        let untyped = parse_business_list("vid1", r#"[{"name": "Shop"}]"#).unwrap();
        assert_eq!(untyped[0].kind, "other");
        assert!(parse_business_list("vid1", "none found").is_err());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("blåbær", 3), "blå");
        assert_eq!(truncate_chars("", 3), "");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_recipe_content() {
        let recipe = RecipeEntry {
            name: "Smoked salmon".to_string(),
            ingredients: vec!["salmon".to_string(), "salt".to_string()],
            steps: vec!["Brine overnight.".to_string(), "Smoke 6 hours.".to_string()],
            cooking_method: Some("smoker".to_string()),
        };
        assert_eq!(
            recipe.content(),
            "Smoked salmon: ingredients salmon, salt; steps Brine overnight. Smoke 6 hours. (cooked smoker)"
        );
    }

    #[test]
    fn test_extraction_request_truncates_inputs() {
        let settings = ExtractionSettings {
            max_transcript_chars: 10,
            ..ExtractionSettings::default()
        };
        let extractor = Extractor::new(
            Arc::new(ScriptedGenerator::new(Vec::<String>::new())),
            Prompts::default(),
            settings,
        );

        let request = extractor.extraction_request(&video(), "0123456789TRAILING");
        let user = &request.messages[1].content;
        assert!(user.contains("Video Title: Winter Camping in a Snow Trench"));
        assert!(user.contains("0123456789"));
        assert!(!user.contains("TRAILING"));
        assert!(user.contains(&"d".repeat(500)));
        assert!(!user.contains(&"d".repeat(501)));
        assert_eq!(request.max_output_tokens, 4096);
    }

    #[tokio::test]
    async fn test_extract_uses_generator_reply() {
        let extractor = Extractor::new(
            Arc::new(ScriptedGenerator::new([
                r#"{"survival_tips": ["Keep your boots dry"]}"#,
            ])),
            Prompts::default(),
            ExtractionSettings::default(),
        );

        let extraction = extractor.extract(&video(), "transcript").await.unwrap();
        assert_eq!(extraction.survival_tips, vec!["Keep your boots dry"]);
    }

    #[tokio::test]
    async fn test_empty_description_skips_business_call() {
        let generator = Arc::new(ScriptedGenerator::new(Vec::<String>::new()));
        let extractor = Extractor::new(
            generator.clone(),
            Prompts::default(),
            ExtractionSettings::default(),
        );
        let mut v = video();
        v.description = "   ".to_string();

        assert!(extractor.extract_businesses(&v).await.unwrap().is_empty());
        assert_eq!(generator.calls(), 0);
    }
}
