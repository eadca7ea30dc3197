use owo_colors::OwoColorize;
use serde_json::json;
use tabled::builder::Builder;
use tabled::settings::Style;

use super::session::table_name;
use super::{CommandOutput, GridSession};
use crate::cli::{GridArgs, OutputOptions};
use crate::columns::ColumnDefinition;
use crate::error::Result;
use crate::store::memory::clamp_window;

/// Show one page of a table
pub async fn cmd_page(args: GridArgs, output: OutputOptions) -> Result<()> {
    let session = GridSession::open(&args)?;
    if let Err(e) = session.load().await {
        session.close().await;
        return Err(e);
    }

    let controller = session.controller();
    let snapshot = controller.columns();
    let visible: Vec<&ColumnDefinition> = snapshot
        .resolve_visible(args.columns.as_deref())?
        .iter()
        .filter_map(|id| snapshot.lookup(id.as_str()).ok())
        .collect();

    let (rows, total_length) = session.page();
    let paging = controller.paging();
    let (start, _) = clamp_window(total_length, paging.offset, paging.limit);
    let cache_key = controller.cache_key();

    let choices: serde_json::Map<String, serde_json::Value> = visible
        .iter()
        .filter_map(|column| {
            controller
                .filter_choices(column.id().as_str())
                .map(|values| (column.id().to_string(), json!(values)))
        })
        .collect();

    let json_output = json!({
        "table": args.table.to_string_lossy(),
        "offset": start,
        "limit": paging.limit,
        "total_length": total_length,
        "cache_key": cache_key.as_ref().map(|k| k.to_string()),
        "columns": visible.iter().map(|c| c.id().to_string()).collect::<Vec<_>>(),
        "rows": rows,
        "filter_choices": choices,
    });

    let mut text_output = String::new();
    text_output.push_str(&format!(
        "{}\n",
        table_name(&args.table).cyan().bold()
    ));

    if rows.is_empty() {
        text_output.push_str("No rows found.");
    } else {
        let mut builder = Builder::default();
        builder.push_record(visible.iter().map(|c| c.header().to_string()));
        for row in &rows {
            builder.push_record(visible.iter().map(|c| row.value(c.id()).render()));
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        text_output.push_str(&table.to_string());
    }

    let first = if rows.is_empty() { 0 } else { start + 1 };
    text_output.push_str(&format!(
        "\n\n{}",
        format!(
            "Rows {}-{} of {}",
            first,
            start + rows.len(),
            total_length
        )
        .dimmed()
    ));

    session.close().await;

    CommandOutput::new(json_output)
        .with_text(text_output)
        .print(output)
}
