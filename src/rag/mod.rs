//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Prompt context and citations are built from retrieval hits; the session
//! in [`crate::orchestrator`] drives the pipeline.

pub mod context;
mod response;

pub use context::{collect_sources, format_context_for_prompt, format_hits_for_display};
pub use response::{RagAnswer, FALLBACK_MESSAGE};
