use std::fmt;

use crate::fetch::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    /// A refresh failed and the failure is being reported.
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Idle => write!(f, "idle"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingState {
    pub offset: usize,
    pub limit: usize,
}

impl Default for PagingState {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// How a call to `refresh` settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Rows were handed to the view.
    Applied { total_length: usize, row_count: usize },
    /// The fetch failed and the failure was reported.
    Failed { message: String, user_error: bool },
    /// Another fetch is in flight; this request was tracked and will be
    /// dispatched when that one returns.
    Queued,
    /// The controller was disposed while the fetch was in flight.
    Discarded,
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}
