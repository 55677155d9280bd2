//! Error types for fixloop-state

use thiserror::Error;

/// Errors raised while setting up a persistence backend.
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors surfaced through the storage traits.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure (query, connection, lock poisoning).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A fixture file exists but could not be understood.
    #[error("malformed fixture {path}: {reason}")]
    MalformedFixture { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}
