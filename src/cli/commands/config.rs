//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command against the file at `config_path`.
pub fn run_config(action: &ConfigAction, mut settings: Settings, config_path: PathBuf) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            settings.set_value(key, value)?;
            settings.save_to(&config_path)?;
            Output::success(&format!("Set {} = {}", key, value));
            Output::kv("Config", &config_path.display().to_string());
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
