//! Trailguide - a question-answering guide for a single YouTube channel
//!
//! Trailguide turns a channel's videos into a structured knowledge base and
//! answers questions about it with grounded, cited replies.
//!
//! # Overview
//!
//! Trailguide allows you to:
//! - Pull video metadata and transcripts from a YouTube channel
//! - Extract survival tips, techniques, recipes, gear, businesses and dad jokes
//! - Embed every record and save the result as a versioned JSON artifact
//! - Ask questions and get answers with links back to the source videos
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `source` - Video catalog and transcript retrieval
//! - `extraction` - LLM extraction and knowledge base assembly
//! - `knowledge` - The knowledge base model and its JSON artifact
//! - `embedding` - Embedding generation
//! - `generation` - Text generation
//! - `index` - Hybrid keyword and vector retrieval
//! - `rag` - Prompt context and answer formatting
//! - `orchestrator` - The session state machine tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use trailguide::config::Settings;
//! use trailguide::knowledge::artifact;
//! use trailguide::orchestrator::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let kb = artifact::load(&settings.knowledge_base_path())?;
//!
//!     let session = Session::from_settings(&settings)?;
//!     session.initialize(&kb).await?;
//!
//!     let answer = session.query("How do I keep a cabin warm?").await?;
//!     println!("{}", answer.response);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod generation;
pub mod index;
pub mod knowledge;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod source;

#[cfg(test)]
mod testing;

pub use error::{GuideError, Result};
