//! Stats command implementation.

use super::{knowledge_base_path, load_knowledge_base};
use crate::cli::Output;
use crate::config::Settings;
use crate::knowledge::FactType;
use anyhow::Result;

/// Run the stats command.
pub fn run_stats(path: Option<String>, settings: Settings) -> Result<()> {
    let path = knowledge_base_path(path.as_deref(), &settings);
    let kb = load_knowledge_base(&path)?;

    Output::header("Knowledge base");
    Output::kv("Path", &path.display().to_string());
    Output::kv("Version", &kb.metadata.version);
    if let Some(channel) = &kb.metadata.channel_name {
        Output::kv("Channel", channel);
    }
    Output::kv(
        "Last updated",
        &kb.metadata.last_updated.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    Output::kv("Videos", &kb.metadata.total_videos.to_string());
    Output::kv("Facts", &kb.facts.len().to_string());
    Output::kv("Businesses", &kb.businesses.len().to_string());
    Output::kv("Dad jokes", &kb.jokes.len().to_string());

    match kb.embedding_dimensions() {
        Some(dims) => Output::kv(
            "Embeddings",
            &format!("{} dimensions, {} records missing", dims, kb.missing_embeddings()),
        ),
        None => Output::kv("Embeddings", "none (run 'trailguide embed')"),
    }

    Output::header("Facts by type");
    for fact_type in [
        FactType::SurvivalTip,
        FactType::BuildingTechnique,
        FactType::LifeLesson,
        FactType::FishingTip,
        FactType::Gear,
        FactType::Recipe,
    ] {
        let count = kb.facts.iter().filter(|f| f.fact_type == fact_type).count();
        Output::kv(fact_type.as_str(), &count.to_string());
    }

    if !kb.categories.is_empty() {
        Output::header("Categories");
        for category in &kb.categories {
            Output::list_item(&format!(
                "{} ({}): {} facts",
                category.name, category.id, category.fact_count
            ));
        }
    }

    Ok(())
}
