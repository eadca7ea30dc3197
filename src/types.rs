use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use unicase::UniCase;

use crate::error::GridError;

/// Column identifier, compared case-insensitively.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ColumnId(UniCase<String>);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        ColumnId(UniCase::new(id.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Case-insensitive comparison against a raw identifier.
    pub fn matches(&self, other: &str) -> bool {
        UniCase::new(self.as_str()) == UniCase::new(other)
    }
}

impl Ord for ColumnId {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        let left = self.as_str().chars().flat_map(char::to_lowercase);
        let right = other.as_str().chars().flat_map(char::to_lowercase);
        left.cmp(right)
            .then_with(|| self.as_str().cmp(other.as_str()))
    }
}

impl PartialOrd for ColumnId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ColumnId {
    fn from(s: &str) -> Self {
        ColumnId::new(s)
    }
}

impl From<String> for ColumnId {
    fn from(s: String) -> Self {
        ColumnId::new(s)
    }
}

impl Serialize for ColumnId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ColumnId::new(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDir {
    Asc,
    Desc,
    #[default]
    None,
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDir::Asc => write!(f, "ASC"),
            SortDir::Desc => write!(f, "DESC"),
            SortDir::None => write!(f, "NONE"),
        }
    }
}

impl FromStr for SortDir {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            "none" => Ok(SortDir::None),
            _ => Err(GridError::Other(format!(
                "invalid sort direction '{s}', expected asc, desc or none"
            ))),
        }
    }
}

pub const VALID_SORT_DIRS: &[&str] = &["asc", "desc", "none"];

/// Sort order sent to the store. No column or `NONE` means server default order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: Option<ColumnId>,
    pub dir: SortDir,
}

impl SortSpec {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn is_unsorted(&self) -> bool {
        self.column.is_none() || self.dir == SortDir::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecomputeMode {
    ComputeAndCache,
    FetchFromCache,
    FetchFromCacheAndRecompute,
}

impl fmt::Display for RecomputeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecomputeMode::ComputeAndCache => write!(f, "COMPUTE_AND_CACHE"),
            RecomputeMode::FetchFromCache => write!(f, "FETCH_FROM_CACHE"),
            RecomputeMode::FetchFromCacheAndRecompute => {
                write!(f, "FETCH_FROM_CACHE_AND_RECOMPUTE")
            }
        }
    }
}

/// Server-side handle of a cached result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        CacheKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token identifying a generated export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadToken(String);

impl DownloadToken {
    pub fn new(token: impl Into<String>) -> Self {
        DownloadToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cell. JSON `null`, integers, floats, RFC 3339 strings and other
/// strings map onto the variants in that order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Integer(i64),
    Real(f64),
    Timestamp(Timestamp),
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Text used for filtering, distinct values and export.
    pub fn render(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Integer(n) => n.to_string(),
            CellValue::Real(x) => x.to_string(),
            CellValue::Timestamp(ts) => ts.strftime("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(n) => Some(*n as f64),
            CellValue::Real(x) => Some(*x),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Empty => 0,
            CellValue::Integer(_) | CellValue::Real(_) => 1,
            CellValue::Timestamp(_) => 2,
            CellValue::Text(_) => 3,
        }
    }

    /// Total order used for sorting.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (
                CellValue::Integer(_) | CellValue::Real(_),
                CellValue::Integer(_) | CellValue::Real(_),
            ) => {
                let a = self.as_f64().unwrap_or_default();
                let b = other.as_f64().unwrap_or_default();
                a.total_cmp(&b)
            }
            (CellValue::Timestamp(a), CellValue::Timestamp(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Integer(n)
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        CellValue::Real(x)
    }
}

/// Raw row as delivered by the store, keyed by column id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridRow {
    cells: BTreeMap<ColumnId, CellValue>,
}

impl GridRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<ColumnId>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<ColumnId>, value: impl Into<CellValue>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Missing cells read as empty.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(&ColumnId::new(column)).unwrap_or(&EMPTY_CELL)
    }

    pub fn value(&self, column: &ColumnId) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&ColumnId, &CellValue)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_id_case_insensitive() {
        assert_eq!(ColumnId::new("Name"), ColumnId::new("NAME"));
        assert!(ColumnId::new("code").matches("CODE"));
        assert_eq!(
            ColumnId::new("a").cmp(&ColumnId::new("B")),
            Ordering::Less
        );
        assert_eq!(ColumnId::new("Name").to_string(), "Name");
    }

    #[test]
    fn test_column_id_serializes_as_string() {
        let json = serde_json::to_string(&ColumnId::new("CODE")).unwrap();
        assert_eq!(json, "\"CODE\"");
        let back: ColumnId = serde_json::from_str("\"code\"").unwrap();
        assert_eq!(back, ColumnId::new("CODE"));
    }

    #[test]
    fn test_sort_dir_parse() {
        assert_eq!("asc".parse::<SortDir>().unwrap(), SortDir::Asc);
        assert_eq!("DESC".parse::<SortDir>().unwrap(), SortDir::Desc);
        assert_eq!("None".parse::<SortDir>().unwrap(), SortDir::None);
        assert!("up".parse::<SortDir>().is_err());
    }

    #[test]
    fn test_recompute_mode_wire_names() {
        let json = serde_json::to_string(&RecomputeMode::FetchFromCacheAndRecompute).unwrap();
        assert_eq!(json, "\"FETCH_FROM_CACHE_AND_RECOMPUTE\"");
        assert_eq!(
            RecomputeMode::ComputeAndCache.to_string(),
            "COMPUTE_AND_CACHE"
        );
    }

    #[test]
    fn test_cell_value_deserialize_variants() {
        let cells: Vec<CellValue> =
            serde_json::from_str(r#"[null, 3, 2.5, "2024-03-01T10:15:00Z", "abc"]"#).unwrap();
        assert_eq!(cells[0], CellValue::Empty);
        assert_eq!(cells[1], CellValue::Integer(3));
        assert_eq!(cells[2], CellValue::Real(2.5));
        assert!(matches!(cells[3], CellValue::Timestamp(_)));
        assert_eq!(cells[4], CellValue::Text("abc".to_string()));
    }

    #[test]
    fn test_cell_value_render_timestamp() {
        let ts: Timestamp = "2024-03-01T10:15:00Z".parse().unwrap();
        assert_eq!(CellValue::Timestamp(ts).render(), "2024-03-01 10:15:00");
        assert_eq!(CellValue::Empty.render(), "");
    }

    #[test]
    fn test_cell_value_ordering() {
        assert_eq!(
            CellValue::Integer(2).compare(&CellValue::Real(10.0)),
            Ordering::Less
        );
        assert_eq!(
            CellValue::Empty.compare(&CellValue::Integer(-5)),
            Ordering::Less
        );
        assert_eq!(
            CellValue::from("apple").compare(&CellValue::from("Banana")),
            Ordering::Less
        );
        assert_eq!(
            CellValue::Integer(1).compare(&CellValue::from("1")),
            Ordering::Less
        );
    }

    #[test]
    fn test_grid_row_lookup_is_case_insensitive() {
        let row = GridRow::new().with("Code", "S1").with("COUNT", 4i64);
        assert_eq!(row.get("CODE"), &CellValue::from("S1"));
        assert_eq!(row.get("count"), &CellValue::Integer(4));
        assert_eq!(row.get("missing"), &CellValue::Empty);
        assert_eq!(row.len(), 2);
    }
}
