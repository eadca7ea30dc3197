//! In-process result set cache.
//!
//! Result sets are computed from an [`OriginalDataProvider`] and cached under
//! a generated key until released. Every fetch filters and sorts the cached
//! rows again, so paging and re-sorting never reload the original data.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use jiff::Timestamp;

use crate::error::{GridError, Result};
use crate::fetch::{FetchRequest, FetchResult};
use crate::filter::RowFilter;
use crate::store::{
    ExportRequest, KeyGenerator, MAX_DISTINCT_COLUMN_VALUES, OriginalDataProvider,
    ResultSetStore, UuidKeyGenerator,
};
use crate::types::{CacheKey, ColumnId, DownloadToken, GridRow, RecomputeMode, SortDir, SortSpec};

struct CachedTable {
    rows: Arc<Vec<GridRow>>,
    created_at: Timestamp,
}

pub struct CachedResultSetStore {
    provider: Arc<dyn OriginalDataProvider>,
    key_generator: Box<dyn KeyGenerator>,
    tables: DashMap<CacheKey, CachedTable>,
    exports: DashMap<DownloadToken, (CacheKey, String)>,
    max_distinct_values: usize,
}

impl CachedResultSetStore {
    pub fn new(provider: Arc<dyn OriginalDataProvider>) -> Self {
        Self {
            provider,
            key_generator: Box::new(UuidKeyGenerator),
            tables: DashMap::new(),
            exports: DashMap::new(),
            max_distinct_values: MAX_DISTINCT_COLUMN_VALUES,
        }
    }

    pub fn with_key_generator(mut self, generator: impl KeyGenerator + 'static) -> Self {
        self.key_generator = Box::new(generator);
        self
    }

    pub fn with_max_distinct_values(mut self, max: usize) -> Self {
        self.max_distinct_values = max;
        self
    }

    pub fn cached_keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.tables.iter().map(|e| e.key().clone()).collect();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        keys
    }

    pub fn is_cached(&self, key: &CacheKey) -> bool {
        self.tables.contains_key(key)
    }

    /// Remove and return a generated export.
    ///
    /// Exports not taken before their result set is released are dropped
    /// with it.
    pub fn take_export(&self, token: &DownloadToken) -> Option<String> {
        self.exports.remove(token).map(|(_, (_, content))| content)
    }

    pub fn pending_exports(&self) -> usize {
        self.exports.len()
    }

    async fn compute(&self, key: CacheKey) -> Result<(CacheKey, Arc<Vec<GridRow>>)> {
        let rows = Arc::new(self.provider.load_rows().await?);
        tracing::debug!(key = %key, rows = rows.len(), "computed result set");
        self.tables.insert(
            key.clone(),
            CachedTable {
                rows: Arc::clone(&rows),
                created_at: Timestamp::now(),
            },
        );
        Ok((key, rows))
    }

    fn cached_rows(&self, key: &CacheKey) -> Option<Arc<Vec<GridRow>>> {
        self.tables.get(key).map(|table| Arc::clone(&table.rows))
    }

    async fn resolve(&self, request: &FetchRequest) -> Result<(CacheKey, Arc<Vec<GridRow>>)> {
        match (request.recompute_mode, &request.cache_key) {
            (RecomputeMode::FetchFromCache, Some(key)) => match self.cached_rows(key) {
                Some(rows) => Ok((key.clone(), rows)),
                None => {
                    tracing::warn!("Reference to the stale cache key {}", key);
                    self.compute(self.key_generator.next_key()).await
                }
            },
            (RecomputeMode::FetchFromCacheAndRecompute, Some(key)) => {
                self.compute(key.clone()).await
            }
            _ => self.compute(self.key_generator.next_key()).await,
        }
    }

    fn distinct_values(
        &self,
        rows: &[GridRow],
        columns: impl Iterator<Item = ColumnId>,
    ) -> BTreeMap<ColumnId, Vec<String>> {
        let mut distinct = BTreeMap::new();
        for column in columns {
            if distinct.contains_key(&column) {
                continue;
            }
            let mut seen = HashSet::new();
            let mut values = Vec::new();
            let mut overflow = false;
            for row in rows {
                let value = row.value(&column).render();
                if seen.insert(value.clone()) {
                    if values.len() == self.max_distinct_values {
                        overflow = true;
                        break;
                    }
                    values.push(value);
                }
            }
            if !overflow {
                distinct.insert(column, values);
            }
        }
        distinct
    }
}

/// Filter and sort `rows`. Sorting is stable; an unsorted spec keeps
/// the original order.
fn select<'a>(rows: &'a [GridRow], filter: &RowFilter, sort: &SortSpec) -> Vec<&'a GridRow> {
    let mut selected: Vec<&GridRow> = rows.iter().filter(|row| filter.matches(row)).collect();
    if let Some(column) = &sort.column {
        match sort.dir {
            SortDir::Asc => {
                selected.sort_by(|a, b| a.value(column).compare(b.value(column)));
            }
            SortDir::Desc => {
                selected.sort_by(|a, b| b.value(column).compare(a.value(column)));
            }
            SortDir::None => {}
        }
    }
    selected
}

/// Clamp a page window to `size` rows.
pub fn clamp_window(size: usize, offset: usize, limit: usize) -> (usize, usize) {
    let offset = if size == 0 { 0 } else { offset.min(size - 1) };
    let count = (size - offset).min(limit);
    (offset, count)
}

fn project(row: &GridRow, columns: &[ColumnId]) -> GridRow {
    if columns.is_empty() {
        return row.clone();
    }
    let mut projected = GridRow::new();
    for column in columns {
        let value = row.value(column);
        if !value.is_empty() {
            projected.insert(column.clone(), value.clone());
        }
    }
    projected
}

fn tsv_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

#[async_trait::async_trait]
impl ResultSetStore for CachedResultSetStore {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult> {
        request.validate()?;
        let filter = RowFilter::compile(&request.filters)?;

        let (key, rows) = self.resolve(request).await?;
        let selected = select(&rows, &filter, &request.sort);
        let (offset, count) = clamp_window(selected.len(), request.offset, request.limit);

        let page = selected[offset..offset + count]
            .iter()
            .map(|row| project(row, &request.columns))
            .collect();
        let distinct_column_values = self.distinct_values(&rows, filter.columns().cloned());

        tracing::debug!(
            key = %key,
            mode = %request.recompute_mode,
            offset,
            count,
            total = selected.len(),
            "served result set page"
        );

        Ok(FetchResult {
            rows: page,
            total_length: selected.len(),
            new_cache_key: key,
            distinct_column_values,
        })
    }

    async fn release_cache(&self, key: &CacheKey) -> Result<()> {
        match self.tables.remove(key) {
            Some((_, table)) => {
                let age = Timestamp::now().duration_since(table.created_at);
                tracing::debug!(key = %key, age = ?age, "released result set");
            }
            None => tracing::warn!("Cannot release unknown cache key {}", key),
        }
        let before = self.exports.len();
        self.exports.retain(|_, (owner, _)| *owner != *key);
        let dropped = before - self.exports.len();
        if dropped > 0 {
            tracing::debug!(key = %key, dropped, "dropped untaken exports");
        }
        Ok(())
    }

    async fn export(&self, request: &ExportRequest) -> Result<DownloadToken> {
        if request.columns.is_empty() {
            return Err(GridError::InvalidRequest(
                "no columns selected for export".to_string(),
            ));
        }
        let rows = self
            .cached_rows(&request.cache_key)
            .ok_or_else(|| GridError::UnknownCacheKey(request.cache_key.to_string()))?;
        let filter = RowFilter::compile(&request.filters)?;
        let selected = select(&rows, &filter, &request.sort);

        let mut content = request
            .columns
            .iter()
            .map(|c| tsv_field(c.as_str()))
            .collect::<Vec<_>>()
            .join("\t");
        content.push('\n');
        for row in selected {
            let line = request
                .columns
                .iter()
                .map(|c| tsv_field(&row.value(c).render()))
                .collect::<Vec<_>>()
                .join("\t");
            content.push_str(&line);
            content.push('\n');
        }

        let token = DownloadToken::new(uuid::Uuid::new_v4().to_string());
        tracing::debug!(key = %request.cache_key, token = %token, "generated export");
        self.exports
            .insert(token.clone(), (request.cache_key.clone(), content));
        Ok(token)
    }
}
