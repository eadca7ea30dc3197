//! Column filters applied to a grid.
//!
//! A [`FilterSet`] records what the user typed or picked per column. It never
//! triggers a fetch itself: every effective mutation bumps
//! [`FilterSet::generation`], which the controller uses as its
//! "filters changed" signal and to debounce bursts of keystrokes.

pub mod matcher;

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ColumnId;

pub use matcher::{PatternFilter, RowFilter};

/// How long typing must pause before a filter refresh is issued.
pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FilterValue {
    /// Free-text pattern. An empty pattern matches empty cells only.
    Pattern(String),
    /// Discrete value picked from the distinct values of the column.
    Selected(String),
}

impl FilterValue {
    pub fn as_str(&self) -> &str {
        match self {
            FilterValue::Pattern(s) | FilterValue::Selected(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriterion {
    pub column: ColumnId,
    pub value: FilterValue,
}

impl FilterCriterion {
    pub fn pattern(column: impl Into<ColumnId>, pattern: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: FilterValue::Pattern(pattern.into()),
        }
    }

    pub fn selected(column: impl Into<ColumnId>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: FilterValue::Selected(value.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct FilterSet {
    criteria: Vec<FilterCriterion>,
    generation: u64,
    choices: HashMap<ColumnId, Vec<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or remove the text filter of a column.
    ///
    /// `None` removes the criterion. `Some("")` is kept: it asks for rows
    /// whose cell is empty. Returns whether anything changed.
    pub fn set_filter(&mut self, column: impl Into<ColumnId>, pattern: Option<&str>) -> bool {
        let column = column.into();
        match pattern {
            Some(pattern) => self.put(column, FilterValue::Pattern(pattern.to_string())),
            None => self.clear_filter(&column),
        }
    }

    /// Set or remove the dropdown selection of a column.
    pub fn select_value(&mut self, column: impl Into<ColumnId>, value: Option<&str>) -> bool {
        let column = column.into();
        match value {
            Some(value) => self.put(column, FilterValue::Selected(value.to_string())),
            None => self.clear_filter(&column),
        }
    }

    pub fn clear_filter(&mut self, column: &ColumnId) -> bool {
        let before = self.criteria.len();
        self.criteria.retain(|c| &c.column != column);
        let changed = self.criteria.len() != before;
        if changed {
            self.bump();
        }
        changed
    }

    pub fn clear_all(&mut self) -> bool {
        if self.criteria.is_empty() {
            return false;
        }
        self.criteria.clear();
        self.bump();
        true
    }

    /// Criteria to send with the next fetch, in the order they were first set.
    pub fn to_fetch_list(&self) -> Vec<FilterCriterion> {
        self.criteria.clone()
    }

    pub fn get(&self, column: &ColumnId) -> Option<&FilterValue> {
        self.criteria
            .iter()
            .find(|c| &c.column == column)
            .map(|c| &c.value)
    }

    pub fn has_any(&self) -> bool {
        !self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace dropdown choices with the distinct values of the last fetch.
    ///
    /// Columns missing from `values` had too many distinct values and lose
    /// their dropdown.
    pub fn update_choices<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (ColumnId, Vec<String>)>,
    {
        self.choices = values.into_iter().collect();
    }

    pub fn choices(&self, column: &ColumnId) -> Option<&[String]> {
        self.choices.get(column).map(Vec::as_slice)
    }

    fn put(&mut self, column: ColumnId, value: FilterValue) -> bool {
        match self.criteria.iter_mut().find(|c| c.column == column) {
            Some(existing) if existing.value == value => return false,
            Some(existing) => existing.value = value,
            None => self.criteria.push(FilterCriterion { column, value }),
        }
        self.bump();
        true
    }

    fn bump(&mut self) {
        self.generation += 1;
    }
}
