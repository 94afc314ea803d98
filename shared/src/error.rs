//! Error types for the calendar Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A query parameter that failed coercion or a declared constraint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    /// Name of the offending field
    pub field: String,
    /// The constraint that was violated
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failures reported by the data source.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connectivity, authorization or SQL error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A single-row read matched nothing
    #[error("expected exactly one row, found none")]
    NoRows,

    /// A single-row read matched more than one row
    #[error("expected exactly one row, found several")]
    MultipleRows,

    /// The row did not have the expected shape
    #[error("failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors that can occur in the calendar Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Backend(BackendError::Database(err))
    }
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(_) => 401,
            _ => 500,
        }
    }

    /// Message safe to return to an untrusted caller.
    ///
    /// Validation failures describe the caller's own input and are returned
    /// as-is. Everything else is reduced to a fixed message; the cause stays
    /// in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Error::Validation(e) => e.to_string(),
            Error::Auth(_) => "Authentication required".to_string(),
            Error::Backend(_) => "Failed to load calendar".to_string(),
            _ => "Internal error".to_string(),
        }
    }
}
