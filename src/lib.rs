pub mod cli;
pub mod columns;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_guards;

pub use columns::{ColumnDefinition, ColumnFlags, ColumnRegistry, ColumnsSnapshot};
pub use config::Config;
pub use controller::{
    ErrorReporter, FilterEvent, GridControllerBuilder, GridDataController, GridSettings,
    GridView, LoadState, PagingEvent, RefreshOutcome, RowModelFactory, SortState,
};
pub use error::{ErrorKind, GridError, Result};
pub use fetch::{FetchRequest, FetchResult, RefreshTrigger};
pub use filter::{FilterCriterion, FilterSet, FilterValue};
pub use store::{CachedResultSetStore, JsonTable, OriginalDataProvider, ResultSetStore};
pub use types::{CacheKey, CellValue, ColumnId, DownloadToken, GridRow, RecomputeMode, SortDir};
