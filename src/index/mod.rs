//! Hybrid retrieval index over the knowledge base.
//!
//! Built once per session from the artifact and read-only afterwards.
//!
//! # Scoring
//!
//! 1. Fetch up to `keyword_candidates` full-text matches (negated bm25).
//! 2. Score every record that has an embedding of the query's
//!    dimensionality by cosine similarity.
//! 3. Min-max normalize each candidate set to `[0, 1]`; a set whose scores
//!    are all equal normalizes to `1.0`.
//! 4. Blend: `score = (1 - α) × keyword + α × vector`, a missing side
//!    counting as `0.0`.
//! 5. Sort by score (desc), then insertion position (asc); truncate.

mod lexical;

pub use lexical::{query_terms, LexicalIndex};

use crate::config::RetrievalSettings;
use crate::error::Result;
use crate::knowledge::{FactSource, KnowledgeBase};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// A flattened, searchable record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    pub id: String,
    pub content: String,
    /// Fact type, `business` or `dad_joke`.
    #[serde(rename = "type")]
    pub record_type: String,
    pub category: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// Videos this record can be cited from.
    pub sources: Vec<FactSource>,
}

impl IndexRecord {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        record_type: impl Into<String>,
        category: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            record_type: record_type.into(),
            category: category.into(),
            embedding,
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<FactSource>) -> Self {
        self.sources = sources;
        self
    }
}

/// Flatten a knowledge base into index records: facts, then businesses,
/// then jokes, each in artifact order.
pub fn flatten(kb: &KnowledgeBase) -> Vec<IndexRecord> {
    let titles = kb.video_titles();
    let title_for = |video_id: &str, fallback: &str| -> String {
        titles
            .get(video_id)
            .map(|t| t.to_string())
            .unwrap_or_else(|| fallback.to_string())
    };

    let mut records = Vec::with_capacity(kb.record_count());

    for fact in &kb.facts {
        records.push(
            IndexRecord::new(
                fact.id.clone(),
                fact.content.clone(),
                fact.fact_type.as_str(),
                fact.category.clone(),
                fact.embedding.clone(),
            )
            .with_sources(vec![FactSource::new(
                fact.video_id.clone(),
                fact.video_title.clone(),
            )]),
        );
    }

    for business in &kb.businesses {
        let sources = business
            .video_references
            .iter()
            .map(|video_id| FactSource::new(video_id.clone(), title_for(video_id, video_id)))
            .collect();
        records.push(
            IndexRecord::new(
                business.id.clone(),
                business.search_text(),
                "business",
                "businesses",
                business.embedding.clone(),
            )
            .with_sources(sources),
        );
    }

    for joke in &kb.jokes {
        records.push(
            IndexRecord::new(
                joke.id.clone(),
                joke.joke.clone(),
                "dad_joke",
                "dad_jokes",
                joke.embedding.clone(),
            )
            .with_sources(vec![FactSource::new(
                joke.video_id.clone(),
                title_for(&joke.video_id, &joke.context),
            )]),
        );
    }

    records
}

/// Retrieval tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridParams {
    /// Weight of vector similarity.
    pub alpha: f64,
    /// Full-text candidates fetched before blending.
    pub keyword_candidates: usize,
}

impl Default for HybridParams {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            keyword_candidates: 50,
        }
    }
}

impl From<&RetrievalSettings> for HybridParams {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            alpha: settings.hybrid_alpha.clamp(0.0, 1.0),
            keyword_candidates: settings.keyword_candidates,
        }
    }
}

/// Input for a single lookup.
#[derive(Debug, Clone, Copy)]
pub struct SearchQuery<'a> {
    pub text: &'a str,
    /// Query embedding; empty means keyword-only.
    pub embedding: &'a [f32],
    pub limit: usize,
}

/// A ranked hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record: IndexRecord,
    /// Blended relevance in `[0, 1]`.
    pub score: f64,
    pub keyword_score: f64,
    pub vector_score: f64,
}

/// In-memory hybrid index.
pub struct KnowledgeIndex {
    records: Vec<IndexRecord>,
    lexical: LexicalIndex,
    params: HybridParams,
}

impl KnowledgeIndex {
    /// Build an index with default parameters.
    pub fn build(records: Vec<IndexRecord>) -> Result<Self> {
        Self::build_with_params(records, HybridParams::default())
    }

    /// Build an index from a full batch of records.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn build_with_params(records: Vec<IndexRecord>, params: HybridParams) -> Result<Self> {
        let lexical = LexicalIndex::build(
            records
                .iter()
                .map(|r| (r.content.as_str(), r.category.as_str())),
        )?;

        let mut dimensions: Vec<usize> = records
            .iter()
            .map(|r| r.embedding.len())
            .filter(|len| *len > 0)
            .collect();
        dimensions.sort_unstable();
        dimensions.dedup();
        if dimensions.len() > 1 {
            warn!(
                "Index records carry mixed embedding dimensions {:?}; similarity is only computed for matching vectors",
                dimensions
            );
        }

        info!("Built retrieval index with {} records", records.len());
        Ok(Self {
            records,
            lexical,
            params,
        })
    }

    /// Flatten and index a knowledge base.
    pub fn from_knowledge_base(kb: &KnowledgeBase, params: HybridParams) -> Result<Self> {
        Self::build_with_params(flatten(kb), params)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub fn params(&self) -> HybridParams {
        self.params
    }

    /// Hybrid lookup. Returns at most `limit` hits ordered by non-increasing
    /// score; identical inputs always produce identical output.
    pub fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<SearchHit>> {
        if query.limit == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let keyword = self
            .lexical
            .search(query.text, self.params.keyword_candidates)?;

        let vector: Vec<(usize, f64)> = if query.embedding.is_empty() {
            Vec::new()
        } else {
            self.records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.embedding.len() == query.embedding.len())
                .map(|(i, r)| (i, cosine_similarity(query.embedding, &r.embedding) as f64))
                .collect()
        };

        if keyword.is_empty() && vector.is_empty() {
            return Ok(Vec::new());
        }

        let mut keyword_scores: Vec<Option<f64>> = vec![None; self.records.len()];
        for (position, score) in normalize_scores(&keyword) {
            keyword_scores[position] = Some(score);
        }
        let mut vector_scores: Vec<Option<f64>> = vec![None; self.records.len()];
        for (position, score) in normalize_scores(&vector) {
            vector_scores[position] = Some(score);
        }

        let alpha = self.params.alpha;
        let mut scored: Vec<(usize, f64, f64, f64)> = keyword_scores
            .iter()
            .zip(vector_scores.iter())
            .enumerate()
            .filter(|(_, (k, v))| k.is_some() || v.is_some())
            .map(|(position, (k, v))| {
                let k = k.unwrap_or(0.0);
                let v = v.unwrap_or(0.0);
                (position, (1.0 - alpha) * k + alpha * v, k, v)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(query.limit);

        debug!(
            "Hybrid search: {} keyword, {} vector candidates, {} hits",
            keyword.len(),
            vector.len(),
            scored.len()
        );

        Ok(scored
            .into_iter()
            .map(|(position, score, keyword_score, vector_score)| SearchHit {
                record: self.records[position].clone(),
                score,
                keyword_score,
                vector_score,
            })
            .collect())
    }
}

/// Min-max normalize candidate scores to `[0, 1]`.
pub fn normalize_scores(candidates: &[(usize, f64)]) -> Vec<(usize, f64)> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let s_min = candidates
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::INFINITY, f64::min);
    let s_max = candidates
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::NEG_INFINITY, f64::max);

    candidates
        .iter()
        .map(|(position, s)| {
            let norm = if (s_max - s_min).abs() < f64::EPSILON {
                1.0
            } else {
                (s - s_min) / (s_max - s_min)
            };
            (*position, norm)
        })
        .collect()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{Business, BusinessType, DadJoke, Fact, FactType};
    use std::collections::BTreeSet;

    fn record(id: &str, content: &str, category: &str, embedding: Vec<f32>) -> IndexRecord {
        IndexRecord::new(id, content, "survival_tip", category, embedding)
    }

    fn query<'a>(text: &'a str, embedding: &'a [f32], limit: usize) -> SearchQuery<'a> {
        SearchQuery {
            text,
            embedding,
            limit,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_normalize_scores() {
        let normalized = normalize_scores(&[(0, 2.0), (1, 4.0), (2, 3.0)]);
        assert_eq!(normalized, vec![(0, 0.0), (1, 1.0), (2, 0.5)]);

        let flat = normalize_scores(&[(3, 0.7), (4, 0.7)]);
        assert_eq!(flat, vec![(3, 1.0), (4, 1.0)]);
    }

    #[test]
    fn test_snow_shelter_single_record() {
        let index = KnowledgeIndex::build(vec![record(
            "f1",
            "Dig a snow trench 2 feet deep",
            "winter_survival",
            vec![0.9, 0.1, 0.0],
        )])
        .unwrap();

        let hits = index
            .search(&query("how do I build a snow shelter", &[0.8, 0.3, 0.1], 1))
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "f1");
    }

    #[test]
    fn test_snow_shelter_beats_unrelated_records() {
        let index = KnowledgeIndex::build(vec![
            record("f2", "Catch halibut with herring bait", "fishing", vec![0.0, 0.0, 1.0]),
            record("f1", "Dig a snow trench 2 feet deep", "winter_survival", vec![0.9, 0.1, 0.0]),
            record("f3", "Notch the logs before stacking", "carpentry", vec![0.1, 0.9, 0.0]),
        ])
        .unwrap();

        let hits = index
            .search(&query("how do I build a snow shelter", &[0.8, 0.3, 0.1], 1))
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "f1");
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = KnowledgeIndex::build(Vec::new()).unwrap();
        assert!(index.is_empty());
        let hits = index.search(&query("snow", &[1.0, 0.0], 5)).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_zero_limit_returns_nothing() {
        let index =
            KnowledgeIndex::build(vec![record("f1", "snow", "winter", vec![1.0, 0.0])]).unwrap();
        assert!(index.search(&query("snow", &[1.0, 0.0], 0)).unwrap().is_empty());
    }

    #[test]
    fn test_results_bounded_ordered_and_from_corpus() {
        let records: Vec<IndexRecord> = (0..12)
            .map(|i| {
                let angle = i as f32 * 0.25;
                record(
                    &format!("r{}", i),
                    if i % 3 == 0 { "fire starter in the snow" } else { "cast near the rocks" },
                    "general",
                    vec![angle.cos(), angle.sin()],
                )
            })
            .collect();
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let index = KnowledgeIndex::build(records).unwrap();

        for k in [1, 3, 5, 12, 40] {
            let hits = index.search(&query("snow fire", &[1.0, 0.2], k)).unwrap();
            assert!(hits.len() <= k);
            assert!(hits.iter().all(|h| ids.contains(&h.record.id)));
            for pair in hits.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = KnowledgeIndex::build(vec![
            record("zeta", "Keep your matches dry", "gear", vec![0.5, 0.5]),
            record("alpha", "Keep your matches dry", "gear", vec![0.5, 0.5]),
        ])
        .unwrap();

        let hits = index.search(&query("dry matches", &[0.5, 0.5], 2)).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, hits[1].score);
        assert_eq!(hits[0].record.id, "zeta");
        assert_eq!(hits[1].record.id, "alpha");
    }

    #[test]
    fn test_search_is_deterministic() {
        let index = KnowledgeIndex::build(vec![
            record("a", "snow cave", "winter", vec![0.3, 0.7]),
            record("b", "snow trench", "winter", vec![0.7, 0.3]),
            record("c", "smoke salmon", "cooking", vec![0.5, 0.5]),
        ])
        .unwrap();

        let q = query("snow", &[0.6, 0.4], 3);
        let first = index.search(&q).unwrap();
        for _ in 0..5 {
            assert_eq!(index.search(&q).unwrap(), first);
        }
    }

    #[test]
    fn test_keyword_only_when_query_has_no_embedding() {
        let index = KnowledgeIndex::build(vec![
            record("a", "Smoke salmon over alder", "cooking", vec![1.0, 0.0]),
            record("b", "Pack a sleeping bag liner", "gear", vec![0.0, 1.0]),
        ])
        .unwrap();

        let hits = index.search(&query("salmon", &[], 5)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "a");
        assert_eq!(hits[0].vector_score, 0.0);
    }

    #[test]
    fn test_mismatched_dimensions_are_skipped_for_vectors() {
        let index = KnowledgeIndex::build(vec![
            record("a", "alpha", "x", vec![1.0, 0.0, 0.0]),
            record("b", "beta", "x", vec![1.0, 0.0]),
        ])
        .unwrap();

        let hits = index.search(&query("nothing matches", &[1.0, 0.0], 5)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "b");
    }

    #[test]
    fn test_flatten_resolves_sources() {
        let mut kb = KnowledgeBase::empty();
        kb.facts.push(Fact {
            id: "f1".to_string(),
            fact_type: FactType::Gear,
            content: "Bring a folding saw".to_string(),
            embedding: vec![1.0],
            category: "gear".to_string(),
            video_id: "v1".to_string(),
            video_title: "Cabin Build Day 1".to_string(),
            timestamp: None,
            tags: BTreeSet::new(),
        });
        kb.businesses.push(Business {
            id: "b1".to_string(),
            name: "Homer Charters".to_string(),
            business_type: BusinessType::Charter,
            location: "Homer, AK".to_string(),
            contact: None,
            url: None,
            video_references: vec!["v1".to_string(), "v9".to_string()],
            description: "Halibut fishing".to_string(),
            embedding: vec![1.0],
        });
        kb.jokes.push(DadJoke {
            id: "j1".to_string(),
            joke: "Why did the scarecrow win an award?".to_string(),
            context: "Winter Trip".to_string(),
            video_id: "v2".to_string(),
            timestamp: None,
            embedding: vec![1.0],
        });

        let records = flatten(&kb);
        let types: Vec<&str> = records.iter().map(|r| r.record_type.as_str()).collect();
        assert_eq!(types, vec!["gear", "business", "dad_joke"]);

        assert_eq!(records[1].sources[0].video_title, "Cabin Build Day 1");
        assert_eq!(records[1].sources[1].video_title, "v9");
        assert!(records[1].content.contains("Homer, AK"));
        assert_eq!(records[2].sources[0].video_title, "Winter Trip");
    }
}
