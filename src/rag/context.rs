//! Context and citation assembly for RAG responses.

use crate::index::SearchHit;
use crate::knowledge::FactSource;
use std::collections::HashSet;

/// Format hits for the prompt: one `[type] content` paragraph per hit, in
/// ranked order.
pub fn format_context_for_prompt(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("[{}] {}", hit.record.record_type, hit.record.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Citations for the hits, deduplicated by video id in first-seen order.
pub fn collect_sources(hits: &[SearchHit]) -> Vec<FactSource> {
    let mut seen = HashSet::new();
    hits.iter()
        .flat_map(|hit| hit.record.sources.iter())
        .filter(|source| seen.insert(source.video_id.clone()))
        .cloned()
        .collect()
}

/// Format hits for display to the user.
pub fn format_hits_for_display(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            let from = hit
                .record
                .sources
                .first()
                .map(|s| format!("\n  From: {} ({})", s.video_title, s.url()))
                .unwrap_or_default();

            format!(
                "[{}] {} (score: {:.2}){}",
                hit.record.record_type, hit.record.content, hit.score, from
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexRecord;

    fn hit(id: &str, kind: &str, content: &str, videos: &[(&str, &str)]) -> SearchHit {
        SearchHit {
            record: IndexRecord::new(id, content, kind, "general", Vec::new()).with_sources(
                videos
                    .iter()
                    .map(|(vid, title)| FactSource::new(*vid, *title))
                    .collect(),
            ),
            score: 0.5,
            keyword_score: 0.5,
            vector_score: 0.5,
        }
    }

    #[test]
    fn test_context_paragraphs_in_rank_order() {
        let hits = vec![
            hit("f1", "survival_tip", "Dig a snow trench 2 feet deep", &[("v1", "Snow")]),
            hit("j1", "dad_joke", "What's brown and sticky? A stick.", &[("v2", "Jokes")]),
        ];
        assert_eq!(
            format_context_for_prompt(&hits),
            "[survival_tip] Dig a snow trench 2 feet deep\n\n[dad_joke] What's brown and sticky? A stick."
        );
        assert_eq!(format_context_for_prompt(&[]), "");
    }

    #[test]
    fn test_sources_are_deduplicated() {
        let hits = vec![
            hit("f1", "gear", "a", &[("v1", "One")]),
            hit("b1", "business", "b", &[("v2", "Two"), ("v1", "One")]),
            hit("f2", "gear", "c", &[("v1", "One")]),
        ];
        let sources = collect_sources(&hits);
        assert_eq!(
            sources,
            vec![FactSource::new("v1", "One"), FactSource::new("v2", "Two")]
        );
    }

    #[test]
    fn test_display_includes_link() {
        let hits = vec![hit("f1", "gear", "Folding saw", &[("abc", "Cabin")])];
        let display = format_hits_for_display(&hits);
        assert!(display.starts_with("[gear] Folding saw (score: 0.50)"));
        assert!(display.contains("https://youtube.com/watch?v=abc"));
    }
}
