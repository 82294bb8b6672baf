//! Batch knowledge-base builder.

use super::category::{display_name, infer_category};
use super::{BusinessEntry, Extractor, VideoExtraction};
use crate::embedding::Embedder;
use crate::error::{GuideError, Result};
use crate::knowledge::{
    content_id, Business, BusinessType, Category, DadJoke, Fact, FactType, KnowledgeBase, Metadata,
};
use crate::source::{PlaylistInfo, TranscriptSource, VideoCatalog, VideoInfo};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// A video that could not be (fully) processed.
#[derive(Debug)]
pub struct BuildFailure {
    pub video_id: String,
    pub title: String,
    pub error: GuideError,
}

/// Outcome of a batch build.
#[derive(Debug)]
pub struct BuildReport {
    pub knowledge_base: KnowledgeBase,
    pub failures: Vec<BuildFailure>,
    /// Place names mentioned across all videos, in first-seen order.
    pub locations: Vec<String>,
}

fn parse_business_type(kind: &str) -> BusinessType {
    match kind.trim().to_lowercase().as_str() {
        "charter" => BusinessType::Charter,
        "restaurant" => BusinessType::Restaurant,
        "store" => BusinessType::Store,
        "lodge" => BusinessType::Lodge,
        "guide" => BusinessType::Guide,
        _ => BusinessType::Other,
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Turns per-video extractions into knowledge-base records.
#[derive(Debug, Default)]
pub struct KnowledgeAccumulator {
    facts: Vec<Fact>,
    fact_ids: HashSet<String>,
    businesses: Vec<Business>,
    business_index: HashMap<String, usize>,
    jokes: Vec<DadJoke>,
    joke_ids: HashSet<String>,
    locations: Vec<String>,
}

impl KnowledgeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_fact(&mut self, video: &VideoInfo, fact_type: FactType, content: String, category: &str, tags: &[&str]) {
        let content = content.trim().to_string();
        if content.is_empty() {
            return;
        }
        let id = content_id(&content);
        if !self.fact_ids.insert(id.clone()) {
            return;
        }

        let mut tag_set: BTreeSet<String> = tags.iter().map(|t| t.to_string()).collect();
        tag_set.insert(category.to_string());

        self.facts.push(Fact {
            id,
            fact_type,
            content,
            embedding: Vec::new(),
            category: category.to_string(),
            video_id: video.video_id.clone(),
            video_title: video.title.clone(),
            timestamp: None,
            tags: tag_set,
        });
    }

    /// Add everything extracted from one video's transcript.
    pub fn add_extraction(&mut self, video: &VideoInfo, category: &str, extraction: &VideoExtraction) {
        for tip in &extraction.survival_tips {
            self.push_fact(video, FactType::SurvivalTip, tip.clone(), category, &["survival"]);
        }
        for technique in &extraction.building_techniques {
            self.push_fact(
                video,
                FactType::BuildingTechnique,
                technique.clone(),
                "building",
                &["building", "construction"],
            );
        }
        for lesson in &extraction.life_lessons {
            self.push_fact(
                video,
                FactType::LifeLesson,
                lesson.clone(),
                "life_lessons",
                &["wisdom", "philosophy"],
            );
        }
        for tip in &extraction.fishing_tips {
            self.push_fact(video, FactType::FishingTip, tip.clone(), "fishing", &["fishing"]);
        }
        for gear in &extraction.gear_mentioned {
            self.push_fact(video, FactType::Gear, gear.content(), "gear", &["gear", "equipment"]);
        }
        for recipe in &extraction.recipes {
            self.push_fact(video, FactType::Recipe, recipe.content(), "cooking", &["cooking", "recipe"]);
        }

        for joke in &extraction.dad_jokes {
            let joke = joke.trim();
            if joke.is_empty() {
                continue;
            }
            let id = content_id(joke);
            if !self.joke_ids.insert(id.clone()) {
                continue;
            }
            self.jokes.push(DadJoke {
                id,
                joke: joke.to_string(),
                context: video.title.clone(),
                video_id: video.video_id.clone(),
                timestamp: None,
                embedding: Vec::new(),
            });
        }

        for location in &extraction.locations_visited {
            let location = location.trim();
            if !location.is_empty() && !self.locations.iter().any(|l| l == location) {
                self.locations.push(location.to_string());
            }
        }

        let description = format!("Mentioned in {}", video.title);
        self.add_businesses(video, &extraction.businesses_mentioned, &description);
    }

    /// Add businesses, merging repeated names into one record.
    pub fn add_businesses(&mut self, video: &VideoInfo, entries: &[BusinessEntry], description: &str) {
        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() {
                continue;
            }
            let id = content_id(name);

            if let Some(&position) = self.business_index.get(&id) {
                let business = &mut self.businesses[position];
                if !business.video_references.contains(&video.video_id) {
                    business.video_references.push(video.video_id.clone());
                }
                if business.contact.is_none() {
                    business.contact = non_empty(entry.contact.as_ref());
                }
                if business.url.is_none() {
                    business.url = non_empty(entry.website.as_ref());
                }
                if business.location.is_empty() {
                    business.location = entry.location.trim().to_string();
                }
                continue;
            }

            self.business_index.insert(id.clone(), self.businesses.len());
            self.businesses.push(Business {
                id,
                name: name.to_string(),
                business_type: parse_business_type(&entry.kind),
                location: entry.location.trim().to_string(),
                contact: non_empty(entry.contact.as_ref()),
                url: non_empty(entry.website.as_ref()),
                video_references: vec![video.video_id.clone()],
                description: description.to_string(),
                embedding: Vec::new(),
            });
        }
    }

    /// Assemble the knowledge base. Categories come from playlists first,
    /// then from any fact category no playlist maps to.
    pub fn finish(
        self,
        playlists: &[PlaylistInfo],
        total_videos: u32,
        channel_name: Option<String>,
    ) -> (KnowledgeBase, Vec<String>) {
        let mut categories: Vec<Category> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for playlist in playlists {
            let slug = infer_category(&playlist.title, "");
            if seen.insert(slug.to_string()) {
                categories.push(Category {
                    id: slug.to_string(),
                    name: playlist.title.clone(),
                    description: playlist.description.clone(),
                    playlist_id: playlist.id.clone(),
                    fact_count: 0,
                });
            }
        }
        for fact in &self.facts {
            if seen.insert(fact.category.clone()) {
                categories.push(Category {
                    id: fact.category.clone(),
                    name: display_name(&fact.category),
                    description: String::new(),
                    playlist_id: String::new(),
                    fact_count: 0,
                });
            }
        }

        let mut metadata = Metadata::new(total_videos, self.facts.len() as u32);
        metadata.channel_name = channel_name;

        let mut kb = KnowledgeBase {
            metadata,
            categories,
            facts: self.facts,
            businesses: self.businesses,
            jokes: self.jokes,
        };
        kb.recount_categories();
        (kb, self.locations)
    }
}

/// Transcript source and extractor used for per-video extraction.
struct ExtractionStage {
    transcripts: Arc<dyn TranscriptSource>,
    extractor: Extractor,
}

/// Drives catalog → transcript → extraction → embedding for a channel.
pub struct KnowledgeBuilder {
    catalog: Arc<dyn VideoCatalog>,
    extraction: Option<ExtractionStage>,
    embedder: Option<Arc<dyn Embedder>>,
    max_videos: usize,
    delay: Duration,
    channel_name: Option<String>,
}

impl KnowledgeBuilder {
    pub fn new(
        catalog: Arc<dyn VideoCatalog>,
        transcripts: Arc<dyn TranscriptSource>,
        extractor: Extractor,
    ) -> Self {
        Self {
            extraction: Some(ExtractionStage {
                transcripts,
                extractor,
            }),
            ..Self::catalog_only(catalog)
        }
    }

    /// A builder with no extraction model: the artifact carries metadata and
    /// playlist categories but no records.
    pub fn catalog_only(catalog: Arc<dyn VideoCatalog>) -> Self {
        Self {
            catalog,
            extraction: None,
            embedder: None,
            max_videos: 10,
            delay: Duration::ZERO,
            channel_name: None,
        }
    }

    /// Embed all records after extraction.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_max_videos(mut self, max_videos: usize) -> Self {
        self.max_videos = max_videos;
        self
    }

    /// Pause between videos.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_channel_name(mut self, channel_name: impl Into<String>) -> Self {
        self.channel_name = Some(channel_name.into());
        self
    }

    /// Build a knowledge base.
    pub async fn run(&self) -> Result<BuildReport> {
        self.run_with_progress(|_, _, _| {}).await
    }

    /// Build a knowledge base, calling `on_video(index, total, video)` before
    /// each video. Per-video failures are collected, never fatal; catalog and
    /// embedding failures abort the build.
    ///
    /// A video whose transcript cannot be fetched is skipped entirely,
    /// including its description.
    #[instrument(skip(self, on_video), fields(max_videos = self.max_videos))]
    pub async fn run_with_progress<F>(&self, mut on_video: F) -> Result<BuildReport>
    where
        F: FnMut(usize, usize, &VideoInfo),
    {
        let playlists = self.catalog.list_playlists().await?;
        info!("Found {} playlists", playlists.len());

        let videos = self.catalog.list_uploads(self.max_videos).await?;
        info!("Processing {} videos", videos.len());

        let mut accumulator = KnowledgeAccumulator::new();
        let mut failures = Vec::new();

        match &self.extraction {
            Some(stage) => {
                for (i, video) in videos.iter().enumerate() {
                    if i > 0 && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    on_video(i, videos.len(), video);
                    stage
                        .process_video(&mut accumulator, &mut failures, video)
                        .await;
                }
            }
            None => {
                warn!("No extraction model configured; the knowledge base will have no records");
                for (i, video) in videos.iter().enumerate() {
                    on_video(i, videos.len(), video);
                }
            }
        }

        let (mut knowledge_base, locations) =
            accumulator.finish(&playlists, videos.len() as u32, self.channel_name.clone());

        if let Some(embedder) = &self.embedder {
            let embedded = embed_knowledge_base(&mut knowledge_base, embedder.as_ref(), false).await?;
            info!("Embedded {} records", embedded);
        }

        if !failures.is_empty() {
            error!(
                "{} of {} videos had failures",
                failures
                    .iter()
                    .map(|f| f.video_id.as_str())
                    .collect::<HashSet<_>>()
                    .len(),
                videos.len()
            );
        }

        Ok(BuildReport {
            knowledge_base,
            failures,
            locations,
        })
    }
}

impl ExtractionStage {
    async fn process_video(
        &self,
        accumulator: &mut KnowledgeAccumulator,
        failures: &mut Vec<BuildFailure>,
        video: &VideoInfo,
    ) {
        let fail = |failures: &mut Vec<BuildFailure>, error: GuideError| {
            failures.push(BuildFailure {
                video_id: video.video_id.clone(),
                title: video.title.clone(),
                error,
            });
        };

        let transcript = match self.transcripts.fetch_transcript(&video.video_id).await {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!("Skipping {} ({}): {}", video.video_id, video.title, e);
                fail(failures, e);
                return;
            }
        };

        match self.extractor.extract(video, &transcript).await {
            Ok(extraction) => {
                let category = infer_category(&video.title, &video.description);
                accumulator.add_extraction(video, category, &extraction);
            }
            Err(e) => {
                warn!("Extraction failed for {} ({}): {}", video.video_id, video.title, e);
                fail(failures, e);
            }
        }

        match self.extractor.extract_businesses(video).await {
            Ok(entries) => {
                let description = format!("From video description: {}", video.title);
                accumulator.add_businesses(video, &entries, &description);
            }
            Err(e) => {
                warn!("Description businesses failed for {}: {}", video.video_id, e);
                fail(failures, e);
            }
        }
    }
}

/// Embed every record in one batch. With `only_missing`, records that
/// already carry a vector are left alone. Returns the number embedded.
#[instrument(skip(kb, embedder), fields(model = embedder.model_name()))]
pub async fn embed_knowledge_base(
    kb: &mut KnowledgeBase,
    embedder: &dyn Embedder,
    only_missing: bool,
) -> Result<usize> {
    let wanted = |embedding: &Vec<f32>| !only_missing || embedding.is_empty();

    let mut texts: Vec<String> = Vec::new();
    texts.extend(
        kb.facts
            .iter()
            .filter(|f| wanted(&f.embedding))
            .map(|f| f.content.clone()),
    );
    texts.extend(
        kb.businesses
            .iter()
            .filter(|b| wanted(&b.embedding))
            .map(|b| b.search_text()),
    );
    texts.extend(
        kb.jokes
            .iter()
            .filter(|j| wanted(&j.embedding))
            .map(|j| j.joke.clone()),
    );

    if texts.is_empty() {
        return Ok(0);
    }

    let vectors = embedder.embed_batch(&texts).await?;
    if vectors.len() != texts.len() {
        return Err(GuideError::Embedding(format!(
            "Expected {} embeddings, got {}",
            texts.len(),
            vectors.len()
        )));
    }

    let mut vectors = vectors.into_iter();
    let targets = kb
        .facts
        .iter_mut()
        .map(|f| &mut f.embedding)
        .chain(kb.businesses.iter_mut().map(|b| &mut b.embedding))
        .chain(kb.jokes.iter_mut().map(|j| &mut j.embedding));

    for target in targets {
        if !wanted(target) {
            continue;
        }
        if let Some(vector) = vectors.next() {
            *target = vector;
        }
    }

    Ok(texts.len())
}
