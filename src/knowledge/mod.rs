//! Knowledge base data model.
//!
//! These types are the on-disk artifact shared between the build-time
//! extractor and the runtime session. Field names are part of the artifact
//! format and are serialized in camelCase.

pub mod artifact;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Current artifact schema version. Bumped on breaking layout changes.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Kind of extracted fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    SurvivalTip,
    BuildingTechnique,
    LifeLesson,
    Recipe,
    Gear,
    FishingTip,
}

impl FactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::SurvivalTip => "survival_tip",
            FactType::BuildingTechnique => "building_technique",
            FactType::LifeLesson => "life_lesson",
            FactType::Recipe => "recipe",
            FactType::Gear => "gear",
            FactType::FishingTip => "fishing_tip",
        }
    }
}

impl std::fmt::Display for FactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single fact extracted from a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub id: String,
    #[serde(rename = "type")]
    pub fact_type: FactType,
    pub content: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub category: String,
    pub video_id: String,
    pub video_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// Kind of business mentioned in a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessType {
    Charter,
    Restaurant,
    Store,
    Lodge,
    Guide,
    #[serde(other)]
    Other,
}

impl BusinessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::Charter => "charter",
            BusinessType::Restaurant => "restaurant",
            BusinessType::Store => "store",
            BusinessType::Lodge => "lodge",
            BusinessType::Guide => "guide",
            BusinessType::Other => "other",
        }
    }
}

/// A business (charter, lodge, store...) referenced by one or more videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub business_type: BusinessType,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub video_references: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Business {
    /// Searchable text for this business.
    pub fn search_text(&self) -> String {
        let mut text = format!("{} ({})", self.name, self.business_type.as_str());
        if !self.location.is_empty() {
            text.push_str(&format!(" in {}", self.location));
        }
        if !self.description.is_empty() {
            text.push_str(&format!(". {}", self.description));
        }
        text
    }
}

/// A dad joke told in a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DadJoke {
    pub id: String,
    pub joke: String,
    pub context: String,
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// A topic category derived from channel playlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub playlist_id: String,
    pub fact_count: u32,
}

/// Artifact-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub last_updated: DateTime<Utc>,
    pub total_videos: u32,
    pub total_facts: u32,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
}

impl Metadata {
    pub fn new(total_videos: u32, total_facts: u32) -> Self {
        Self {
            last_updated: Utc::now(),
            total_videos,
            total_facts,
            version: SCHEMA_VERSION.to_string(),
            channel_name: None,
        }
    }
}

/// The aggregate root: an immutable snapshot of everything extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub metadata: Metadata,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub facts: Vec<Fact>,
    #[serde(default)]
    pub businesses: Vec<Business>,
    #[serde(default)]
    pub jokes: Vec<DadJoke>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn empty() -> Self {
        Self {
            metadata: Metadata::new(0, 0),
            categories: Vec::new(),
            facts: Vec::new(),
            businesses: Vec::new(),
            jokes: Vec::new(),
        }
    }

    /// Total number of searchable records.
    pub fn record_count(&self) -> usize {
        self.facts.len() + self.businesses.len() + self.jokes.len()
    }

    /// Recompute every category's `fact_count` from the facts.
    pub fn recount_categories(&mut self) {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for fact in &self.facts {
            *counts.entry(fact.category.as_str()).or_default() += 1;
        }
        for category in &mut self.categories {
            category.fact_count = counts.get(category.id.as_str()).copied().unwrap_or(0);
        }
        self.metadata.total_facts = self.facts.len() as u32;
    }

    /// Map of video id to title, as known from the facts.
    pub fn video_titles(&self) -> HashMap<&str, &str> {
        let mut titles = HashMap::new();
        for fact in &self.facts {
            titles
                .entry(fact.video_id.as_str())
                .or_insert(fact.video_title.as_str());
        }
        titles
    }

    /// Dimensionality of the first non-empty embedding, if any.
    pub fn embedding_dimensions(&self) -> Option<usize> {
        self.facts
            .iter()
            .map(|f| f.embedding.len())
            .chain(self.businesses.iter().map(|b| b.embedding.len()))
            .chain(self.jokes.iter().map(|j| j.embedding.len()))
            .find(|len| *len > 0)
    }

    /// Whether any record is missing its embedding.
    pub fn missing_embeddings(&self) -> usize {
        self.facts.iter().filter(|f| f.embedding.is_empty()).count()
            + self.businesses.iter().filter(|b| b.embedding.is_empty()).count()
            + self.jokes.iter().filter(|j| j.embedding.is_empty()).count()
    }
}

/// Message author in a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A citation pointing back at the video a fact came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactSource {
    pub video_id: String,
    pub video_title: String,
}

impl FactSource {
    pub fn new(video_id: impl Into<String>, video_title: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            video_title: video_title.into(),
        }
    }

    /// Watch URL for the cited video.
    pub fn url(&self) -> String {
        format!("https://youtube.com/watch?v={}", self.video_id)
    }
}

/// One turn of a session's conversation. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<FactSource>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            sources: None,
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<FactSource>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            sources: Some(sources),
        }
    }
}

/// Stable 12-hex-character id for a piece of content.
pub fn content_id(content: &str) -> String {
    let digest = md5::compute(content.as_bytes());
    format!("{:x}", digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(id: &str, category: &str) -> Fact {
        Fact {
            id: id.to_string(),
            fact_type: FactType::SurvivalTip,
            content: "Dig a snow trench 2 feet deep".to_string(),
            embedding: vec![0.6, 0.8],
            category: category.to_string(),
            video_id: "vid1".to_string(),
            video_title: "Winter Camping".to_string(),
            timestamp: None,
            tags: BTreeSet::from(["survival".to_string()]),
        }
    }

    #[test]
    fn test_fact_serializes_with_artifact_field_names() {
        let value = serde_json::to_value(fact("f1", "winter_survival")).unwrap();
        assert_eq!(value["type"], "survival_tip");
        assert_eq!(value["videoId"], "vid1");
        assert_eq!(value["videoTitle"], "Winter Camping");
        assert!(value.get("timestamp").is_none());
        assert!(value.get("fact_type").is_none());
    }

    #[test]
    fn test_unknown_business_type_decodes_as_other() {
        let json = r#"{
            "id": "b1", "name": "Bob's Bait", "type": "bait shop",
            "location": "Homer, AK", "videoReferences": ["vid1"],
            "description": "Mentioned in a video"
        }"#;
        let business: Business = serde_json::from_str(json).unwrap();
        assert_eq!(business.business_type, BusinessType::Other);
        assert!(business.embedding.is_empty());
    }

    #[test]
    fn test_recount_categories() {
        let mut kb = KnowledgeBase::empty();
        kb.categories.push(Category {
            id: "winter_survival".to_string(),
            name: "Winter".to_string(),
            description: String::new(),
            playlist_id: "PL1".to_string(),
            fact_count: 99,
        });
        kb.categories.push(Category {
            id: "fishing".to_string(),
            name: "Fishing".to_string(),
            description: String::new(),
            playlist_id: "PL2".to_string(),
            fact_count: 5,
        });
        kb.facts.push(fact("f1", "winter_survival"));
        kb.facts.push(fact("f2", "winter_survival"));
        kb.facts.push(fact("f3", "building"));

        kb.recount_categories();

        assert_eq!(kb.categories[0].fact_count, 2);
        assert_eq!(kb.categories[1].fact_count, 0);
        assert_eq!(kb.metadata.total_facts, 3);
    }

    #[test]
    fn test_content_id_is_stable() {
        let a = content_id("Always carry a fire starter");
        assert_eq!(a.len(), 12);
        assert_eq!(a, content_id("Always carry a fire starter"));
        assert_ne!(a, content_id("Always carry a fire starter."));
    }

    #[test]
    fn test_embedding_dimensions() {
        let mut kb = KnowledgeBase::empty();
        assert_eq!(kb.embedding_dimensions(), None);
        kb.facts.push(fact("f1", "general"));
        assert_eq!(kb.embedding_dimensions(), Some(2));
        assert_eq!(kb.missing_embeddings(), 0);
    }
}
