use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::columns::{ColumnDefinition, ColumnRegistry};
use crate::controller::ColumnSchemaProvider;
use crate::error::{GridError, Result};
use crate::store::OriginalDataProvider;
use crate::types::GridRow;

/// A table stored as JSON: `{"columns": [...], "rows": [{...}, ...]}`.
///
/// Serves both the rows a result set is computed from and the column schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonTable {
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub rows: Vec<GridRow>,
}

impl JsonTable {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GridError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read table {}: {}", path.display(), e),
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let table: JsonTable = serde_json::from_str(content)?;
        ColumnRegistry::with_columns(table.columns.clone())?;
        Ok(table)
    }
}

#[async_trait::async_trait]
impl OriginalDataProvider for JsonTable {
    async fn load_rows(&self) -> Result<Vec<GridRow>> {
        Ok(self.rows.clone())
    }
}

impl ColumnSchemaProvider for JsonTable {
    fn build_columns_definition(&self) -> Result<Vec<ColumnDefinition>> {
        Ok(self.columns.clone())
    }
}
