//! The result set store boundary.
//!
//! The controller only talks to a [`ResultSetStore`]. It computes result
//! sets, caches them under a key, and serves pages, releases and exports
//! from the cache. [`CachedResultSetStore`] is the in-process implementation.

pub mod json_table;
pub mod memory;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::{FetchRequest, FetchResult};
use crate::filter::FilterCriterion;
use crate::types::{CacheKey, ColumnId, DownloadToken, GridRow, SortSpec};

pub use json_table::JsonTable;
pub use memory::CachedResultSetStore;

/// Default cap on the number of distinct values reported per column.
pub const MAX_DISTINCT_COLUMN_VALUES: usize = 50;

/// What to export from a cached result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub cache_key: CacheKey,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub filters: Vec<FilterCriterion>,
    /// Exported columns, in order.
    pub columns: Vec<ColumnId>,
}

#[async_trait::async_trait]
pub trait ResultSetStore: Send + Sync {
    /// Serve one page of a (possibly freshly computed) result set.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult>;

    /// Drop a cached result set. Releasing an unknown key is harmless.
    async fn release_cache(&self, key: &CacheKey) -> Result<()>;

    /// Generate an export of a cached result set.
    async fn export(&self, request: &ExportRequest) -> Result<DownloadToken>;
}

/// Source of the full, unfiltered rows a result set is computed from.
#[async_trait::async_trait]
pub trait OriginalDataProvider: Send + Sync {
    async fn load_rows(&self) -> Result<Vec<GridRow>>;
}

pub trait KeyGenerator: Send + Sync {
    fn next_key(&self) -> CacheKey;
}

/// Random UUID v4 keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeyGenerator;

impl KeyGenerator for UuidKeyGenerator {
    fn next_key(&self) -> CacheKey {
        CacheKey::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Predictable keys `<prefix>1`, `<prefix>2`, ...
#[derive(Debug)]
pub struct SequenceKeyGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequenceKeyGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl KeyGenerator for SequenceKeyGenerator {
    fn next_key(&self) -> CacheKey {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        CacheKey::new(format!("{}{}", self.prefix, n))
    }
}
