//! Error types for the sandbox layer.

/// Errors produced while running a single unit.
///
/// These never escape [`crate::SandboxExecutor::run`]; they are folded into
/// per-test `Executor failed: …` results.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to spawn interpreter `{interpreter}`: {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode harness payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid sandbox configuration: {0}")]
    InvalidConfig(String),

    #[error("unit task failed: {0}")]
    Task(String),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
