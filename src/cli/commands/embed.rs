//! Embed command implementation.

use super::{knowledge_base_path, load_knowledge_base};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::create_embedder;
use crate::extraction::embed_knowledge_base;
use crate::knowledge::artifact;
use anyhow::Result;

/// Run the embed command.
pub async fn run_embed(path: Option<String>, force: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Embed, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = knowledge_base_path(path.as_deref(), &settings);
    let mut kb = load_knowledge_base(&path)?;

    let missing = kb.missing_embeddings();
    if !force && missing == 0 {
        Output::success("Every record already has an embedding.");
        return Ok(());
    }

    let embedder = create_embedder(&settings.embedding)?;
    let spinner = Output::spinner(&format!(
        "Embedding {} records with {}...",
        if force { kb.record_count() } else { missing },
        embedder.model_name()
    ));
    let result = embed_knowledge_base(&mut kb, embedder.as_ref(), !force).await;
    spinner.finish_and_clear();
    let embedded = result?;

    artifact::save(&kb, &path)?;
    Output::success(&format!("Embedded {} records into {}", embedded, path.display()));
    Ok(())
}
