//! Config command handlers

use std::path::Path;

use anyhow::{Context, Result};

use dex_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "page_size": config.page_size,
                    "storage_quota": config.storage_quota,
                    "export_dir": config.export_dir,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:      {}", config.data_dir.display());
            println!("  page_size:     {}", config.page_size);
            println!("  storage_quota: {}", config.storage_quota);
            println!("  export_dir:    {}", display_or_unset(config.export_dir.as_deref()));
            println!("  log_file:      {}", display_or_unset(config.log_file.as_deref()));
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
///
/// Edits the config file as written; environment overrides in effect for
/// this session are not saved into it.
pub fn set(key: String, value: String, config_path: Option<&Path>, output: &Output) -> Result<()> {
    // Save to the CLI-specified path or default
    let save_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_file_path);
    let mut config = Config::load_file(&save_path).context("Failed to load configuration")?;

    let value = if value == "none" { String::new() } else { value };
    config.set_value(&key, &value)?;

    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn display_or_unset(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
