//! Search command implementation.

use super::start_session;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let session = start_session(&settings).await?;
    let hits = session.retrieve(query, limit).await?;

    if hits.is_empty() {
        Output::info("No matching records found.");
        return Ok(());
    }

    Output::header(&format!("{} results for \"{}\"", hits.len(), query));
    for hit in &hits {
        Output::search_hit(hit);
    }

    Ok(())
}
