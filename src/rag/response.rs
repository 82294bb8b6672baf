//! RAG answers.

use crate::index::SearchHit;
use crate::knowledge::FactSource;

/// Reply given whenever the pipeline cannot produce a grounded answer.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't come up with an answer for that one. Please try again in a moment.";

/// An answer with the videos it was drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct RagAnswer {
    /// The generated answer.
    pub response: String,
    /// Deduplicated citations.
    pub sources: Vec<FactSource>,
    /// Hits used as context, best first.
    pub hits: Vec<SearchHit>,
}

impl RagAnswer {
    /// The fixed fallback reply, with no sources.
    pub fn fallback() -> Self {
        Self {
            response: FALLBACK_MESSAGE.to_string(),
            sources: Vec::new(),
            hits: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.response == FALLBACK_MESSAGE && self.sources.is_empty()
    }

    /// Format the answer for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.response.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!("\n{}\n  {}", source.video_title, source.url()));
            }
        }

        output
    }
}
