//! Interactive chat command.

use super::start_session;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::knowledge::ChatRole;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Some(model) = model {
        settings.generation.model = model;
    }

    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let session = start_session(&settings).await?;

    println!("\n{}", style("Trailguide Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask anything about the channel, 'history' to review, or 'exit' to quit.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Happy trails!");
            break;
        }

        if input.eq_ignore_ascii_case("history") {
            for message in session.messages() {
                let who = match message.role {
                    ChatRole::User => style("You:").green().bold(),
                    ChatRole::Assistant => style("Trailguide:").cyan().bold(),
                };
                println!(
                    "{} {} {}",
                    style(message.timestamp.format("%H:%M:%S")).dim(),
                    who,
                    message.content
                );
            }
            continue;
        }

        match session.query(input).await {
            Ok(answer) => {
                println!("\n{} {}", style("Trailguide:").cyan().bold(), answer.response);
                Output::sources(&answer.sources);
                println!();
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    session.dispose()?;
    Ok(())
}
