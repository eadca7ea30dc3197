//! Interfaces the controller drives: the grid view, the row model factory,
//! the error reporter and the column schema provider.

use crate::columns::ColumnDefinition;
use crate::error::{GridError, Result};
use crate::fetch::RefreshTrigger;
use crate::types::{GridRow, SortDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolbarControl {
    Refresh,
    Export,
}

/// Raw sort state as the grid shows it, before registry translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<String>,
    pub dir: SortDir,
}

impl SortState {
    pub fn new(column: impl Into<String>, dir: SortDir) -> Self {
        Self {
            column: Some(column.into()),
            dir,
        }
    }
}

/// Emitted by the grid when the page window or sort changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingEvent {
    pub offset: usize,
    pub limit: usize,
    pub sort: SortState,
}

/// Emitted by the grid on every keystroke in a column filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEvent {
    pub column: String,
    pub pattern: Option<String>,
}

pub trait GridView<M>: Send + Sync {
    fn set_rows(&self, rows: Vec<M>, total_length: usize);

    fn set_toolbar_enabled(&self, control: ToolbarControl, enabled: bool);

    /// Current sort, which may differ from the last fetched one.
    fn live_sort(&self) -> SortState;

    /// Ids of the columns currently shown. `None` uses the registry defaults.
    fn visible_column_ids(&self) -> Option<Vec<String>>;
}

pub trait RowModelFactory<M>: Send + Sync {
    fn create_row_model(&self, row: GridRow) -> M;
}

impl<M, F> RowModelFactory<M> for F
where
    F: Fn(GridRow) -> M + Send + Sync,
{
    fn create_row_model(&self, row: GridRow) -> M {
        self(row)
    }
}

pub trait ErrorReporter: Send + Sync {
    fn report_user_error(&self, message: &str);

    fn report_unexpected_failure(&self, error: &GridError);
}

/// Reports failures as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_user_error(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn report_unexpected_failure(&self, error: &GridError) {
        tracing::error!(error = %error, "grid refresh failed");
    }
}

/// Builds the column set for the current entity schema.
pub trait ColumnSchemaProvider: Send + Sync {
    fn build_columns_definition(&self) -> Result<Vec<ColumnDefinition>>;
}

/// Passed to completion handlers once a refresh settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCompletion {
    pub trigger: RefreshTrigger,
    pub success: bool,
}

pub type CompletionHandler = Box<dyn Fn(&RefreshCompletion) + Send + Sync>;
