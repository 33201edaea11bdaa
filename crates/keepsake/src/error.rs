use thiserror::Error;

/// Errors produced by the compression engine and its collaborators.
///
/// Parse ambiguity is deliberately absent: malformed model output degrades
/// into the overflow bucket instead of failing.
#[derive(Debug, Error)]
pub enum KeepsakeError {
    /// The external model call failed (network, rate limit, bad response).
    #[error("model call failed: {0}")]
    Model(String),

    /// Invalid configuration, reported before any work starts.
    #[error("config error: {0}")]
    Config(String),

    #[error("scenario error: {0}")]
    Scenario(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KeepsakeError>;
