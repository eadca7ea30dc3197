mod config;
mod export;
mod page;
mod session;

pub use config::{cmd_config_get, cmd_config_set, cmd_config_show};
pub use export::cmd_export;
pub use page::cmd_page;
pub use session::GridSession;

use serde_json::Value;

use crate::cli::OutputOptions;
use crate::error::Result;

/// Result of a command, printed either as text or as JSON.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Print the JSON form when `--json` was given, the text form otherwise.
    pub fn print(self, output: OutputOptions) -> Result<()> {
        match self.text {
            Some(text) if !output.json => {
                println!("{text}");
                Ok(())
            }
            _ => print_json(&self.json),
        }
    }
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
