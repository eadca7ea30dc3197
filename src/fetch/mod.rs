//! The request/response pair exchanged with a result set store, and the
//! client-side bookkeeping around it.

pub mod cache_handle;
pub mod pending;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::filter::FilterCriterion;
use crate::types::{CacheKey, ColumnId, GridRow, RecomputeMode, SortSpec};

pub use cache_handle::CacheHandle;
pub use pending::PendingFetchTracker;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub offset: usize,
    pub limit: usize,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub filters: Vec<FilterCriterion>,
    /// Visible column ids, in registry order.
    #[serde(default)]
    pub columns: Vec<ColumnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<CacheKey>,
    pub recompute_mode: RecomputeMode,
}

impl FetchRequest {
    /// A first-page request computing a fresh result set.
    pub fn first_page(limit: usize) -> Self {
        Self {
            offset: 0,
            limit,
            sort: SortSpec::unsorted(),
            filters: Vec::new(),
            columns: Vec::new(),
            cache_key: None,
            recompute_mode: RecomputeMode::ComputeAndCache,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(GridError::InvalidRequest(
                "limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub rows: Vec<GridRow>,
    pub total_length: usize,
    pub new_cache_key: CacheKey,
    /// Ordered distinct rendered values per filtered column. Columns with
    /// too many distinct values are left out.
    #[serde(default)]
    pub distinct_column_values: BTreeMap<ColumnId, Vec<String>>,
}

impl FetchResult {
    /// A store may never report fewer rows in total than it delivered.
    pub fn check_consistency(&self) -> Result<()> {
        if self.total_length < self.rows.len() {
            return Err(GridError::InconsistentResult {
                total_length: self.total_length,
                rows: self.rows.len(),
            });
        }
        Ok(())
    }
}

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshTrigger {
    Initial,
    PageChanged,
    SortChanged,
    FiltersChanged,
    ColumnsChanged,
    SchemaChanged,
    /// Refresh with invalidation of the cached result set.
    Reload,
}

impl RefreshTrigger {
    /// Whether the cached result set must be recomputed.
    pub fn demands_recompute(self) -> bool {
        matches!(
            self,
            RefreshTrigger::FiltersChanged
                | RefreshTrigger::ColumnsChanged
                | RefreshTrigger::SchemaChanged
                | RefreshTrigger::Reload
        )
    }

    pub fn rebuilds_columns(self) -> bool {
        self == RefreshTrigger::SchemaChanged
    }

    pub fn invalidates_cache(self) -> bool {
        self == RefreshTrigger::Reload
    }
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshTrigger::Initial => "initial",
            RefreshTrigger::PageChanged => "page changed",
            RefreshTrigger::SortChanged => "sort changed",
            RefreshTrigger::FiltersChanged => "filters changed",
            RefreshTrigger::ColumnsChanged => "columns changed",
            RefreshTrigger::SchemaChanged => "schema changed",
            RefreshTrigger::Reload => "reload",
        };
        write!(f, "{name}")
    }
}

/// A request together with the bookkeeping needed to recognize its response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub sequence: u64,
    pub trigger: RefreshTrigger,
    /// Whether the cached result set had to be recomputed when this ticket
    /// was issued. Kept so the request can be re-stamped later.
    pub recompute: bool,
    pub request: FetchRequest,
}
