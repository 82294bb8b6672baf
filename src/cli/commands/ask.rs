//! Ask command implementation.

use super::start_session;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    top_k: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(model) = model {
        settings.generation.model = model;
    }
    if let Some(top_k) = top_k {
        settings.retrieval.top_k = top_k;
    }

    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let session = start_session(&settings).await?;

    let spinner = Output::spinner("Searching knowledge base...");
    let result = session.query(question).await;
    spinner.finish_and_clear();

    let answer = result?;
    println!("\n{}\n", answer.response);
    Output::sources(&answer.sources);

    Ok(())
}
