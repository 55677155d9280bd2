//! Error taxonomy for fixloop-core.
//!
//! Only orchestration-level failures live here. Unextractable text, syntax
//! failures, static defects and runtime errors are ordinary repair-loop
//! outcomes and never surface as `FixloopError`.

use fixloop_state::StorageError;

/// fixloop-core errors.
#[derive(Debug, thiserror::Error)]
pub enum FixloopError {
    #[error("generator error: {0}")]
    Generator(#[from] anyhow::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid repair transition: {event} in state {state}")]
    InvalidTransition { state: String, event: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("parser setup failed: {0}")]
    Parser(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fixloop-core operations.
pub type Result<T> = std::result::Result<T, FixloopError>;
