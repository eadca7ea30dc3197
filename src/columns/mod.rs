//! Column definitions and the registry that resolves them.
//!
//! The registry never mutates a published set of columns: every
//! registration produces a new [`ColumnsSnapshot`] with a bumped version, so a
//! refresh that captured a snapshot keeps a consistent view of the columns
//! even if a schema rebuild happens meanwhile.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::types::{ColumnId, SortDir, SortSpec};

pub const DEFAULT_COLUMN_WIDTH: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnFlags {
    pub sortable: bool,
    pub numeric: bool,
    pub link: bool,
    pub hidden: bool,
}

impl Default for ColumnFlags {
    fn default() -> Self {
        Self {
            sortable: true,
            numeric: false,
            link: false,
            hidden: false,
        }
    }
}

/// Immutable column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    id: ColumnId,
    #[serde(default)]
    header: Option<String>,
    #[serde(default = "default_width")]
    width: u32,
    #[serde(flatten)]
    flags: ColumnFlags,
}

fn default_width() -> u32 {
    DEFAULT_COLUMN_WIDTH
}

impl ColumnDefinition {
    pub fn new(id: impl Into<ColumnId>, header: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            header: Some(header.into()),
            width: DEFAULT_COLUMN_WIDTH,
            flags: ColumnFlags::default(),
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn numeric(mut self) -> Self {
        self.flags.numeric = true;
        self
    }

    pub fn link(mut self) -> Self {
        self.flags.link = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.flags.hidden = true;
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.flags.sortable = false;
        self
    }

    fn with_hidden(mut self, hidden: bool) -> Self {
        self.flags.hidden = hidden;
        self
    }

    pub fn id(&self) -> &ColumnId {
        &self.id
    }

    /// Header text, falling back to the identifier.
    pub fn header(&self) -> &str {
        self.header.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn flags(&self) -> ColumnFlags {
        self.flags
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.hidden
    }

    pub fn is_sortable(&self) -> bool {
        self.flags.sortable
    }
}

/// One published, immutable set of columns.
#[derive(Debug, Default)]
pub struct ColumnsSnapshot {
    version: u64,
    columns: Vec<ColumnDefinition>,
    index: HashMap<ColumnId, usize>,
}

impl ColumnsSnapshot {
    fn build(version: u64, columns: Vec<ColumnDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if index.insert(column.id().clone(), position).is_some() {
                return Err(GridError::DuplicateColumn(column.id().to_string()));
            }
        }
        Ok(Self {
            version,
            columns,
            index,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn lookup(&self, id: &str) -> Result<&ColumnDefinition> {
        self.index
            .get(&ColumnId::new(id))
            .map(|&position| &self.columns[position])
            .ok_or_else(|| GridError::ColumnNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(&ColumnId::new(id))
    }

    /// Columns named in `selected`, in registry order.
    pub fn visible_subset<S: AsRef<str>>(&self, selected: &[S]) -> Result<Vec<&ColumnDefinition>> {
        let mut positions = Vec::with_capacity(selected.len());
        for id in selected {
            let id = id.as_ref();
            let position = self
                .index
                .get(&ColumnId::new(id))
                .ok_or_else(|| GridError::ColumnNotFound(id.to_string()))?;
            positions.push(*position);
        }
        positions.sort_unstable();
        positions.dedup();
        Ok(positions.into_iter().map(|p| &self.columns[p]).collect())
    }

    /// Ids of the columns not flagged hidden.
    pub fn default_visible_ids(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.is_hidden())
            .map(|c| c.id().to_string())
            .collect()
    }

    /// Canonical ids of the shown columns, falling back to the defaults.
    pub fn resolve_visible(&self, selected: Option<&[String]>) -> Result<Vec<ColumnId>> {
        let columns = match selected {
            Some(ids) => self.visible_subset(ids)?,
            None => self.columns.iter().filter(|c| !c.is_hidden()).collect(),
        };
        Ok(columns.into_iter().map(|c| c.id().clone()).collect())
    }
}

/// Keyed set of column definitions. Holds no UI state.
#[derive(Debug, Default)]
pub struct ColumnRegistry {
    current: Arc<ColumnsSnapshot>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(columns: Vec<ColumnDefinition>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(columns)?;
        Ok(registry)
    }

    /// Replace the full set of columns.
    pub fn register(&mut self, columns: Vec<ColumnDefinition>) -> Result<Arc<ColumnsSnapshot>> {
        let snapshot = ColumnsSnapshot::build(self.current.version + 1, columns)?;
        self.current = Arc::new(snapshot);
        tracing::debug!(
            version = self.current.version,
            columns = self.current.len(),
            "registered column definitions"
        );
        Ok(Arc::clone(&self.current))
    }

    /// Register a schema rebuild, keeping order and visibility of surviving ids.
    pub fn rebuild_preserving(
        &mut self,
        fresh: Vec<ColumnDefinition>,
    ) -> Result<Arc<ColumnsSnapshot>> {
        let staged = self.stage_rebuild(fresh)?;
        Ok(self.install(staged))
    }

    /// Build the snapshot a rebuild would publish, without publishing it.
    pub fn stage_rebuild(&self, fresh: Vec<ColumnDefinition>) -> Result<Arc<ColumnsSnapshot>> {
        let merged = merge_preserving(&self.current, fresh);
        Ok(Arc::new(ColumnsSnapshot::build(
            self.current.version + 1,
            merged,
        )?))
    }

    /// Publish a snapshot from [`stage_rebuild`](Self::stage_rebuild).
    ///
    /// A snapshot staged against an older version is renumbered so versions
    /// keep increasing.
    pub fn install(&mut self, staged: Arc<ColumnsSnapshot>) -> Arc<ColumnsSnapshot> {
        self.current = if staged.version > self.current.version {
            staged
        } else {
            Arc::new(ColumnsSnapshot {
                version: self.current.version + 1,
                columns: staged.columns.clone(),
                index: staged.index.clone(),
            })
        };
        tracing::debug!(
            version = self.current.version,
            columns = self.current.len(),
            "installed rebuilt column definitions"
        );
        Arc::clone(&self.current)
    }

    pub fn snapshot(&self) -> Arc<ColumnsSnapshot> {
        Arc::clone(&self.current)
    }

    pub fn lookup(&self, id: &str) -> Result<&ColumnDefinition> {
        self.current.lookup(id)
    }

    pub fn visible_subset<S: AsRef<str>>(&self, selected: &[S]) -> Result<Vec<&ColumnDefinition>> {
        self.current.visible_subset(selected)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// Merge a freshly built schema into the previous one.
///
/// Ids present before keep their previous relative order and hidden flag;
/// ids new to the schema follow in schema order. Ids no longer in the schema
/// are dropped.
pub fn merge_preserving(
    previous: &ColumnsSnapshot,
    fresh: Vec<ColumnDefinition>,
) -> Vec<ColumnDefinition> {
    let mut surviving: Vec<(usize, ColumnDefinition)> = Vec::new();
    let mut added = Vec::new();

    for column in fresh {
        match previous.index.get(column.id()) {
            Some(&position) => {
                let hidden = previous.columns[position].is_hidden();
                surviving.push((position, column.with_hidden(hidden)));
            }
            None => added.push(column),
        }
    }

    surviving.sort_by_key(|(position, _)| *position);
    surviving
        .into_iter()
        .map(|(_, column)| column)
        .chain(added)
        .collect()
}

/// Translate a grid's raw sort state into a [`SortSpec`].
///
/// The column id is canonicalized to the registry's spelling. An unknown
/// column is a caller bug and fails with `ColumnNotFound`; sorting on a
/// column flagged unsortable is a precondition failure.
pub fn translate_sort(
    columns: &ColumnsSnapshot,
    column: Option<&str>,
    dir: SortDir,
) -> Result<SortSpec> {
    let column = match column {
        Some(id) => {
            let definition = columns.lookup(id)?;
            if dir != SortDir::None && !definition.is_sortable() {
                return Err(GridError::Precondition(format!(
                    "column '{}' is not sortable",
                    definition.id()
                )));
            }
            Some(definition.id().clone())
        }
        None => None,
    };
    Ok(SortSpec { column, dir })
}
