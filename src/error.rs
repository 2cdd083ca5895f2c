//! Error types for dialtrack.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DialError>;

#[derive(Error, Debug)]
pub enum DialError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid window: {0}")]
    InvalidWindow(String),

    #[error("timestamp out of range")]
    InvalidTimestamp,

    #[error("storage failure: {0}")]
    Storage(String),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("database is closed")]
    DatabaseClosed,

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<DialError>,
    },
}

/// Coarse classification of a [`DialError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidWindow,
    Storage,
    Cancelled,
    Closed,
    Invalid,
}

impl DialError {
    /// Classify this error, looking through any context layers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DialError::NotFound(_) => ErrorKind::NotFound,
            DialError::Unauthorized(_) => ErrorKind::Unauthorized,
            DialError::InvalidWindow(_) => ErrorKind::InvalidWindow,
            DialError::Storage(_) | DialError::Io(_) => ErrorKind::Storage,
            #[cfg(feature = "sqlite")]
            DialError::Sqlite(_) => ErrorKind::Storage,
            DialError::Cancelled | DialError::DeadlineExceeded => ErrorKind::Cancelled,
            DialError::DatabaseClosed => ErrorKind::Closed,
            DialError::InvalidTimestamp | DialError::Serialization(_) | DialError::Config(_) => {
                ErrorKind::Invalid
            }
            DialError::Context { source, .. } => source.kind(),
        }
    }

    /// The innermost error beneath any context layers.
    pub fn root(&self) -> &DialError {
        match self {
            DialError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DialError::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        DialError::Unauthorized(msg.into())
    }

    pub fn invalid_window(msg: impl Into<String>) -> Self {
        DialError::InvalidWindow(msg.into())
    }
}

impl From<serde_json::Error> for DialError {
    fn from(e: serde_json::Error) -> Self {
        DialError::Serialization(e.to_string())
    }
}

/// Attach the failing operation to an error.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E: Into<DialError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| DialError::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| DialError::Context {
            context: f().into(),
            source: Box::new(e.into()),
        })
    }
}
