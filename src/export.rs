//! Server-side export of the result set a grid currently shows.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::columns::{ColumnsSnapshot, translate_sort};
use crate::controller::SortState;
use crate::error::{GridError, Result};
use crate::filter::FilterCriterion;
use crate::store::{ExportRequest, ResultSetStore};
use crate::types::{CacheKey, DownloadToken};

pub const REFRESH_BEFORE_EXPORTING: &str = "refresh before exporting";

/// Build an export request for what the grid shows right now.
///
/// Uses the live sort of the grid and the columns currently visible, not the
/// ones of the last fetch. Fails without side effects when no result set has
/// been fetched yet.
pub fn build_export_request(
    cache_key: Option<&CacheKey>,
    columns: &ColumnsSnapshot,
    live_sort: &SortState,
    filters: Vec<FilterCriterion>,
    visible: Option<&[String]>,
) -> Result<ExportRequest> {
    let cache_key = match cache_key {
        Some(key) if !columns.is_empty() => key.clone(),
        _ => return Err(GridError::Precondition(REFRESH_BEFORE_EXPORTING.to_string())),
    };
    let sort = translate_sort(columns, live_sort.column.as_deref(), live_sort.dir)?;
    let columns = columns.resolve_visible(visible)?;
    Ok(ExportRequest {
        cache_key,
        sort,
        filters,
        columns,
    })
}

/// Sends export requests and remembers the last download token.
pub struct ExportTrigger {
    store: Arc<dyn ResultSetStore>,
    last_token: Mutex<Option<DownloadToken>>,
}

impl ExportTrigger {
    pub fn new(store: Arc<dyn ResultSetStore>) -> Self {
        Self {
            store,
            last_token: Mutex::new(None),
        }
    }

    pub async fn export(&self, request: &ExportRequest) -> Result<DownloadToken> {
        let token = self.store.export(request).await?;
        tracing::info!(key = %request.cache_key, token = %token, "export ready");
        *self.last_token.lock() = Some(token.clone());
        Ok(token)
    }

    pub fn last_token(&self) -> Option<DownloadToken> {
        self.last_token.lock().clone()
    }
}
