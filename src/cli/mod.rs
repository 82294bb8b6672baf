//! CLI module for Trailguide.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Trailguide - chat with what an outdoor channel has taught
///
/// Builds a knowledge base of tips, jokes and businesses from a YouTube
/// channel's transcripts, then answers questions from it with a local or
/// hosted language model.
#[derive(Parser, Debug)]
#[command(name = "trailguide")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape the channel and build the knowledge base artifact
    Build {
        /// Output path (a .json file, or a directory for the split layout)
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum number of videos to process
        #[arg(short, long)]
        max_videos: Option<usize>,

        /// YouTube Data API key
        #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// API key for the extraction model; without one (and no
        /// extraction.api_base) only playlists and categories are built
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        extraction_key: Option<String>,

        /// Skip the embedding pass
        #[arg(long)]
        no_embed: bool,
    },

    /// Compute embeddings for an existing knowledge base
    Embed {
        /// Knowledge base path (defaults to knowledge_base.path)
        #[arg(short, long)]
        path: Option<String>,

        /// Recompute embeddings that already exist
        #[arg(long)]
        force: bool,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,

        /// Number of records to use as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Search the knowledge base without generating an answer
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show knowledge base statistics
    Stats {
        /// Knowledge base path (defaults to knowledge_base.path)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "generation.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
