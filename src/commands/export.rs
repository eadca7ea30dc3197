use std::fs;
use std::path::Path;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, GridSession};
use crate::cli::{GridArgs, OutputOptions};
use crate::error::{GridError, Result};

/// Export the filtered, sorted table as tab-separated values
pub async fn cmd_export(
    args: GridArgs,
    destination: Option<&Path>,
    output: OutputOptions,
) -> Result<()> {
    let session = GridSession::open(&args)?;
    let exported = export_content(&session).await;
    session.close().await;
    let (token, content) = exported?;

    let row_count = content.lines().count().saturating_sub(1);

    if let Some(path) = destination {
        fs::write(path, &content).map_err(|e| {
            GridError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write export to {}: {}", path.display(), e),
            ))
        })?;

        let json_output = json!({
            "action": "export",
            "token": token,
            "rows": row_count,
            "output": path.to_string_lossy(),
        });
        let text_output = format!(
            "Exported {} row(s) to {}",
            row_count,
            path.display().to_string().cyan()
        );
        return CommandOutput::new(json_output)
            .with_text(text_output)
            .print(output);
    }

    let json_output = json!({
        "action": "export",
        "token": token,
        "rows": row_count,
        "content": content,
    });
    CommandOutput::new(json_output)
        .with_text(content.trim_end_matches('\n'))
        .print(output)
}

async fn export_content(session: &GridSession) -> Result<(String, String)> {
    session.load().await?;
    let token = session.controller().export().await?;
    let content = session
        .store()
        .take_export(&token)
        .ok_or_else(|| GridError::Store(format!("export {token} is no longer available")))?;
    Ok((token.to_string(), content))
}
