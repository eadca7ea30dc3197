//! Configuration commands for managing grid settings.
//!
//! - `config show`: Display current configuration
//! - `config get`: Print a single value
//! - `config set`: Validate and store a value

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::config::Config;
use crate::error::{GridError, Result};

/// Catch `grid_page_size` style keys before they reach the generic lookup.
fn validate_config_key(key: &str) -> Result<&str> {
    if !key.contains('.')
        && let Some(pos) = key.find('_')
    {
        let dot_version = format!("{}.{}", &key[..pos], &key[pos + 1..]);
        return Err(GridError::Config(format!(
            "invalid config key '{key}'. Use dot notation: '{dot_version}'"
        )));
    }
    Ok(key)
}

/// Show current configuration
pub fn cmd_config_show(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let page_size = config.page_size();

    let json_output = json!({
        "grid": {
            "page_size": page_size,
            "filter_debounce_ms": config.grid.filter_debounce_ms,
        },
        "store": {
            "max_distinct_values": config.store.max_distinct_values,
        },
        "config_file": Config::config_path().to_string_lossy(),
    });

    let mut text_output = String::new();
    text_output.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));

    text_output.push_str(&format!("{}:\n", "grid".cyan()));
    if page_size == config.grid.page_size {
        text_output.push_str(&format!("  page_size: {page_size}\n"));
    } else {
        text_output.push_str(&format!(
            "  page_size: {} {}\n",
            page_size,
            "(from GRIDCACHE_PAGE_SIZE)".dimmed()
        ));
    }
    text_output.push_str(&format!(
        "  filter_debounce_ms: {}\n",
        config.grid.filter_debounce_ms
    ));

    text_output.push('\n');
    text_output.push_str(&format!("{}:\n", "store".cyan()));
    text_output.push_str(&format!(
        "  max_distinct_values: {}\n",
        config.store.max_distinct_values
    ));

    text_output.push('\n');
    text_output.push_str(&format!(
        "{}",
        format!("Config file: {}", Config::config_path().display()).dimmed()
    ));

    CommandOutput::new(json_output)
        .with_text(text_output)
        .print(output)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, output: OutputOptions) -> Result<()> {
    validate_config_key(key)?;

    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    let stored = config.get(key)?;
    let json_output = json!({
        "action": "config_set",
        "key": key,
        "value": stored,
        "success": true,
    });
    let text_output = format!("Set {} to {}", key.cyan(), stored);

    CommandOutput::new(json_output)
        .with_text(text_output)
        .print(output)
}

/// Get a configuration value
pub fn cmd_config_get(key: &str, output: OutputOptions) -> Result<()> {
    validate_config_key(key)?;

    let config = Config::load()?;
    let value = config.get(key)?;

    let json_output = json!({
        "key": key,
        "value": value,
    });

    CommandOutput::new(json_output)
        .with_text(value)
        .print(output)
}
