//! Config command handlers

use anyhow::{Context, Result};

use feedsync_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "source_url": config.source_url,
                    "api_key_set": config.api_key.is_some(),
                    "page_size": config.page_size,
                    "request_timeout_secs": config.request_timeout_secs,
                    "probe_interval_secs": config.probe_interval_secs,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  source_url:           {}", config.source_url);
            println!(
                "  api_key:              {}",
                if config.api_key.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!("  page_size:            {}", config.page_size);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!("  probe_interval_secs:  {}", config.probe_interval_secs);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    // "none" clears optional values
    let value = if value == "none" { String::new() } else { value };
    config.set_value(&key, &value).with_context(|| {
        format!(
            "Could not set '{}'\n\
             Valid keys: data_dir, source_url, api_key, page_size, \
             request_timeout_secs, probe_interval_secs, log_file",
            key
        )
    })?;

    config.save().context("Failed to save configuration")?;

    let shown = if key == "api_key" && !value.is_empty() {
        "(set)"
    } else {
        value.as_str()
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}
