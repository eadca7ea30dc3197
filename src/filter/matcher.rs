//! Evaluation of filter criteria against rows.
//!
//! Matching is case-insensitive and works on the rendered cell value. A
//! pattern is a list of whitespace separated terms (double quotes group a
//! term with spaces):
//!
//! - `abc` matches values containing `abc`
//! - `^abc`, `abc$` and `^abc$` anchor at the start, end or both
//! - `!abc` excludes values matching `abc`
//! - `<n`, `>n`, `<=n`, `>=n`, `=n` compare numerically
//! - `=abc` is an exact match
//!
//! A value passes when it matches any positive term (or there is none) and
//! no negative term. The empty pattern matches empty values only.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{GridError, Result};
use crate::filter::{FilterCriterion, FilterValue};
use crate::types::{CellValue, ColumnId, GridRow};

static TERM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!?)"([^"]*)"|(\S+)"#).expect("filter term regex should be valid")
});

static COMPARISON_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(<=|>=|<|>|=)(.+)$").expect("comparison regex should be valid")
});

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
}

impl Comparison {
    fn holds(self, value: f64, bound: f64) -> bool {
        match self {
            Comparison::Less => value < bound,
            Comparison::LessOrEqual => value <= bound,
            Comparison::Greater => value > bound,
            Comparison::GreaterOrEqual => value >= bound,
            Comparison::Equal => value == bound,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TermKind {
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Exact(String),
    Numeric(Comparison, f64),
}

#[derive(Debug, Clone, PartialEq)]
struct Term {
    negative: bool,
    kind: TermKind,
}

impl Term {
    fn matches(&self, cell: &CellValue, rendered: &str) -> bool {
        match &self.kind {
            TermKind::Contains(s) => rendered.contains(s.as_str()),
            TermKind::StartsWith(s) => rendered.starts_with(s.as_str()),
            TermKind::EndsWith(s) => rendered.ends_with(s.as_str()),
            TermKind::Exact(s) => rendered == s,
            TermKind::Numeric(op, bound) => cell.as_f64().is_some_and(|v| op.holds(v, *bound)),
        }
    }
}

/// A compiled free-text pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternFilter {
    /// `None` for the empty pattern.
    terms: Option<Vec<Term>>,
}

impl PatternFilter {
    pub fn compile(column: &ColumnId, pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Ok(Self { terms: None });
        }

        let mut terms = Vec::new();
        for captures in TERM_REGEX.captures_iter(pattern) {
            if let Some(quoted) = captures.get(2) {
                let negative = captures.get(1).is_some_and(|m| !m.as_str().is_empty());
                terms.push(Term {
                    negative,
                    kind: TermKind::Contains(quoted.as_str().to_lowercase()),
                });
            } else if let Some(raw) = captures.get(3) {
                terms.push(parse_term(column, raw.as_str())?);
            }
        }

        Ok(Self { terms: Some(terms) })
    }

    pub fn matches(&self, cell: &CellValue) -> bool {
        let rendered = cell.render().to_lowercase();
        let Some(terms) = &self.terms else {
            return rendered.is_empty();
        };

        let mut has_positive = false;
        let mut positive_hit = false;
        for term in terms {
            let hit = term.matches(cell, &rendered);
            if term.negative {
                if hit {
                    return false;
                }
            } else {
                has_positive = true;
                positive_hit |= hit;
            }
        }
        !has_positive || positive_hit
    }
}

fn parse_term(column: &ColumnId, raw: &str) -> Result<Term> {
    let (negative, body) = match raw.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let body = body.to_lowercase();

    if let Some(captures) = COMPARISON_REGEX.captures(&body) {
        let operator = &captures[1];
        let operand = captures[2].trim();
        let comparison = match operator {
            "<" => Comparison::Less,
            "<=" => Comparison::LessOrEqual,
            ">" => Comparison::Greater,
            ">=" => Comparison::GreaterOrEqual,
            _ => Comparison::Equal,
        };
        let kind = match operand.parse::<f64>() {
            Ok(bound) => TermKind::Numeric(comparison, bound),
            Err(_) if comparison == Comparison::Equal => TermKind::Exact(operand.to_string()),
            Err(_) => {
                return Err(GridError::InvalidFilter {
                    column: column.to_string(),
                    message: format!("'{operator}' expects a number, got '{operand}'"),
                });
            }
        };
        return Ok(Term { negative, kind });
    }

    let anchored_start = body.starts_with('^');
    let anchored_end = body.ends_with('$');
    let text = body
        .trim_start_matches('^')
        .strip_suffix('$')
        .map(str::to_string)
        .unwrap_or_else(|| body.trim_start_matches('^').to_string());

    let kind = match (anchored_start, anchored_end) {
        (true, true) => TermKind::Exact(text),
        (true, false) => TermKind::StartsWith(text),
        (false, true) => TermKind::EndsWith(text),
        (false, false) => TermKind::Contains(text),
    };
    Ok(Term { negative, kind })
}

#[derive(Debug, Clone, PartialEq)]
enum CriterionKind {
    Pattern(PatternFilter),
    Selected(String),
}

/// One compiled criterion bound to its column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatcher {
    column: ColumnId,
    kind: CriterionKind,
}

impl ColumnMatcher {
    pub fn compile(criterion: &FilterCriterion) -> Result<Self> {
        let kind = match &criterion.value {
            FilterValue::Pattern(pattern) => {
                CriterionKind::Pattern(PatternFilter::compile(&criterion.column, pattern)?)
            }
            FilterValue::Selected(value) => CriterionKind::Selected(value.to_lowercase()),
        };
        Ok(Self {
            column: criterion.column.clone(),
            kind,
        })
    }

    pub fn column(&self) -> &ColumnId {
        &self.column
    }

    pub fn matches(&self, row: &GridRow) -> bool {
        let cell = row.value(&self.column);
        match &self.kind {
            CriterionKind::Pattern(pattern) => pattern.matches(cell),
            CriterionKind::Selected(value) => cell.render().to_lowercase() == *value,
        }
    }
}

/// Conjunction of all criteria of a fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    matchers: Vec<ColumnMatcher>,
}

impl RowFilter {
    pub fn compile(criteria: &[FilterCriterion]) -> Result<Self> {
        let matchers = criteria
            .iter()
            .map(ColumnMatcher::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { matchers })
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Columns that carry a criterion.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnId> {
        self.matchers.iter().map(ColumnMatcher::column)
    }

    pub fn matches(&self, row: &GridRow) -> bool {
        self.matchers.iter().all(|m| m.matches(row))
    }
}
