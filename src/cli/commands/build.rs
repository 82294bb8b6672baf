//! Build command implementation.

use super::knowledge_base_path;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::embedding::create_embedder;
use crate::extraction::{Extractor, KnowledgeBuilder};
use crate::generation::OpenAIGenerator;
use crate::knowledge::artifact;
use crate::source::{YoutubeCatalog, YtDlpTranscripts};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Run the build command.
pub async fn run_build(
    output: Option<String>,
    max_videos: Option<usize>,
    api_key: Option<String>,
    extraction_key: Option<String>,
    no_embed: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Some(key) = api_key {
        settings.youtube.api_key = Some(key);
    }
    if let Some(key) = extraction_key {
        settings.extraction.api_key = Some(key);
    }
    if let Some(max_videos) = max_videos {
        settings.youtube.max_videos = max_videos;
    }

    if let Err(e) = preflight::check(Operation::Build, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let catalog = Arc::new(YoutubeCatalog::from_settings(&settings.youtube)?);
    let mut builder = if settings.extraction.is_configured() {
        let transcripts = Arc::new(YtDlpTranscripts::new("en")?);
        let generator = Arc::new(OpenAIGenerator::with_config(
            &settings.extraction.model,
            settings.extraction.api_base.as_deref(),
            settings.extraction.api_key.as_deref(),
        )?);
        let extractor = Extractor::new(generator, prompts, settings.extraction.clone());
        KnowledgeBuilder::new(catalog, transcripts, extractor)
    } else {
        Output::warning(
            "No extraction key or extraction.api_base; building playlists and categories only",
        );
        KnowledgeBuilder::catalog_only(catalog)
    }
    .with_max_videos(settings.youtube.max_videos)
    .with_delay(Duration::from_millis(settings.youtube.rate_limit_ms));
    if let Some(channel_name) = &settings.youtube.channel_name {
        builder = builder.with_channel_name(channel_name.clone());
    }
    if !no_embed {
        builder = builder.with_embedder(create_embedder(&settings.embedding)?);
    }

    Output::info(&format!(
        "Building knowledge base from channel {} (up to {} videos)",
        settings.youtube.channel_id, settings.youtube.max_videos
    ));

    let pb = Output::progress_bar(0, "Fetching videos...");
    let report = builder
        .run_with_progress(|i, total, video| {
            pb.set_length(total as u64);
            pb.set_position(i as u64);
            pb.set_message(video.title.chars().take(50).collect::<String>());
        })
        .await;
    pb.finish_and_clear();
    let report = report?;

    let path = knowledge_base_path(output.as_deref(), &settings);
    artifact::save(&report.knowledge_base, &path)?;

    let kb = &report.knowledge_base;
    Output::success(&format!("Knowledge base saved to {}", path.display()));
    Output::kv("Videos", &kb.metadata.total_videos.to_string());
    Output::kv("Facts", &kb.facts.len().to_string());
    Output::kv("Businesses", &kb.businesses.len().to_string());
    Output::kv("Dad jokes", &kb.jokes.len().to_string());
    Output::kv("Categories", &kb.categories.len().to_string());
    Output::kv("Locations mentioned", &report.locations.len().to_string());
    if no_embed {
        Output::info("Embeddings skipped. Run 'trailguide embed' before chatting.");
    }

    if !report.failures.is_empty() {
        Output::header(&format!("{} failures", report.failures.len()));
        for failure in &report.failures {
            Output::list_item(&format!("{} ({}): {}", failure.title, failure.video_id, failure.error));
        }
    }

    Ok(())
}
