//! Trailguide CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trailguide::cli::{commands, Cli, Commands};
use trailguide::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("trailguide={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Build {
            output,
            max_videos,
            api_key,
            extraction_key,
            no_embed,
        } => {
            commands::run_build(
                output.clone(),
                *max_videos,
                api_key.clone(),
                extraction_key.clone(),
                *no_embed,
                settings,
            )
            .await?;
        }

        Commands::Embed { path, force } => {
            commands::run_embed(path.clone(), *force, settings).await?;
        }

        Commands::Ask {
            question,
            model,
            top_k,
        } => {
            commands::run_ask(question, model.clone(), *top_k, settings).await?;
        }

        Commands::Search { query, limit } => {
            commands::run_search(query, *limit, settings).await?;
        }

        Commands::Chat { model } => {
            commands::run_chat(model.clone(), settings).await?;
        }

        Commands::Stats { path } => {
            commands::run_stats(path.clone(), settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
