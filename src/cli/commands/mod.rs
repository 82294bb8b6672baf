//! CLI command implementations.

mod ask;
mod build;
mod chat;
mod config;
mod embed;
mod search;
mod stats;

pub use ask::run_ask;
pub use build::run_build;
pub use chat::run_chat;
pub use config::run_config;
pub use embed::run_embed;
pub use search::run_search;
pub use stats::run_stats;

use crate::cli::Output;
use crate::config::Settings;
use crate::knowledge::{artifact, KnowledgeBase};
use crate::orchestrator::Session;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Resolve an explicit path or fall back to `knowledge_base.path`.
fn knowledge_base_path(path: Option<&str>, settings: &Settings) -> PathBuf {
    path.map(Settings::expand_path)
        .unwrap_or_else(|| settings.knowledge_base_path())
}

fn load_knowledge_base(path: &PathBuf) -> Result<KnowledgeBase> {
    artifact::load(path).with_context(|| {
        format!(
            "Failed to load knowledge base from {}. Run 'trailguide build' first.",
            path.display()
        )
    })
}

/// Load the knowledge base and bring a session to `ready`, rendering its
/// progress.
async fn start_session(settings: &Settings) -> Result<Session> {
    let kb = load_knowledge_base(&settings.knowledge_base_path())?;
    let session = Session::from_settings(settings)?;

    let pb = Output::progress_bar(100, "Starting");
    let mut rx = session.subscribe();
    let watcher = {
        let pb = pb.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let status = rx.borrow_and_update().clone();
                pb.set_position(u64::from(status.progress));
                pb.set_message(status.message);
            }
        })
    };

    let result = session.initialize(&kb).await;
    watcher.abort();
    pb.finish_and_clear();
    result?;

    Ok(session)
}
