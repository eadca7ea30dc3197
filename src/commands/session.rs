//! A one-shot grid for the command line.
//!
//! Wires a [`GridDataController`] to a JSON table, an in-process
//! [`CachedResultSetStore`] and a view that keeps the last page it was given.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cli::GridArgs;
use crate::config::Config;
use crate::controller::{
    ErrorReporter, GridDataController, GridView, PagingEvent, RefreshOutcome, SortState,
    ToolbarControl,
};
use crate::error::{GridError, Result};
use crate::fetch::RefreshTrigger;
use crate::store::{CachedResultSetStore, JsonTable};
use crate::types::GridRow;

/// Keeps the rows of the last applied page.
struct PageView {
    sort: SortState,
    visible: Option<Vec<String>>,
    page: Mutex<(Vec<GridRow>, usize)>,
}

impl GridView<GridRow> for PageView {
    fn set_rows(&self, rows: Vec<GridRow>, total_length: usize) {
        *self.page.lock() = (rows, total_length);
    }

    fn set_toolbar_enabled(&self, control: ToolbarControl, enabled: bool) {
        tracing::trace!(?control, enabled, "toolbar");
    }

    fn live_sort(&self) -> SortState {
        self.sort.clone()
    }

    fn visible_column_ids(&self) -> Option<Vec<String>> {
        self.visible.clone()
    }
}

/// Failures surface as command errors, so the reporter only logs at debug level.
struct CommandReporter;

impl ErrorReporter for CommandReporter {
    fn report_user_error(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn report_unexpected_failure(&self, error: &GridError) {
        tracing::debug!(error = %error, "refresh failed");
    }
}

pub struct GridSession {
    controller: Arc<GridDataController<GridRow>>,
    store: Arc<CachedResultSetStore>,
    view: Arc<PageView>,
    offset: usize,
}

impl GridSession {
    /// Load the table and build a controller with the filters of `args` applied.
    pub fn open(args: &GridArgs) -> Result<Self> {
        let config = Config::load()?;
        let table = Arc::new(JsonTable::load(&args.table)?);
        let store = Arc::new(
            CachedResultSetStore::new(table.clone())
                .with_max_distinct_values(config.store.max_distinct_values),
        );

        let view = Arc::new(PageView {
            sort: SortState {
                column: args.sort.clone(),
                dir: args.sort_dir(),
            },
            visible: args.columns.clone(),
            page: Mutex::new((Vec::new(), 0)),
        });

        let mut settings = config.grid_settings();
        if let Some(limit) = args.limit {
            settings.page_size = limit;
        }

        let controller = GridDataController::<GridRow>::builder(
            store.clone(),
            view.clone(),
            Arc::new(|row: GridRow| row),
        )
        .reporter(Arc::new(CommandReporter))
        .schema_provider(table.clone())
        .settings(settings)
        .columns(table.columns.clone())
        .build()?;

        for (column, pattern) in &args.filters {
            controller.set_filter(column, Some(pattern))?;
        }
        for (column, value) in &args.selections {
            controller.select_value(column, Some(value))?;
        }

        Ok(Self {
            controller,
            store,
            view,
            offset: args.offset,
        })
    }

    pub fn controller(&self) -> &GridDataController<GridRow> {
        &self.controller
    }

    pub fn store(&self) -> &CachedResultSetStore {
        &self.store
    }

    /// Compute the result set, then move to the requested offset.
    ///
    /// Moving to a later page is served from the cached result set.
    pub async fn load(&self) -> Result<()> {
        settle(self.controller.refresh(RefreshTrigger::Initial).await?)?;
        if self.offset > 0 {
            let event = PagingEvent {
                offset: self.offset,
                limit: self.controller.paging().limit,
                sort: self.view.live_sort(),
            };
            settle(self.controller.on_paging_change(event).await?)?;
        }
        Ok(())
    }

    /// Rows of the current page and the length of the whole result set.
    pub fn page(&self) -> (Vec<GridRow>, usize) {
        self.view.page.lock().clone()
    }

    pub async fn close(self) {
        self.controller.dispose().await;
    }
}

fn settle(outcome: RefreshOutcome) -> Result<()> {
    match outcome {
        RefreshOutcome::Applied { .. } => Ok(()),
        RefreshOutcome::Failed { message, .. } => Err(GridError::Other(message)),
        RefreshOutcome::Queued | RefreshOutcome::Discarded => Err(GridError::Other(
            "refresh did not complete".to_string(),
        )),
    }
}

/// Display name of a table file, for headings.
pub fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
