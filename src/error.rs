use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{0}' is defined more than once")]
    DuplicateColumn(String),

    #[error("{0}")]
    Precondition(String),

    #[error("invalid fetch request: {0}")]
    InvalidRequest(String),

    #[error("invalid filter on column '{column}': {message}")]
    InvalidFilter { column: String, message: String },

    #[error("result set '{0}' is not cached")]
    UnknownCacheKey(String),

    #[error("inconsistent result set: total length {total_length} is less than {rows} delivered rows")]
    InconsistentResult { total_length: usize, rows: usize },

    #[error("result set store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// How a failure is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Recoverable input problem, shown as a message.
    UserInput,
    /// Caller misuse. Never swallowed.
    Precondition,
    /// Transport failures, malformed results and everything else.
    Unexpected,
}

impl GridError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GridError::InvalidFilter { .. } => ErrorKind::UserInput,
            GridError::ColumnNotFound(_)
            | GridError::DuplicateColumn(_)
            | GridError::Precondition(_)
            | GridError::InvalidRequest(_) => ErrorKind::Precondition,
            _ => ErrorKind::Unexpected,
        }
    }

    pub fn is_user_error(&self) -> bool {
        self.kind() == ErrorKind::UserInput
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
