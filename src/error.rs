//! Error types for the mood engine.

/// Top-level error type for mood detection and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum MoodError {
    /// Text was empty or whitespace-only.
    #[error("input error: text must not be empty")]
    EmptyInput,

    /// A sentiment estimator could not produce an estimate.
    #[error("estimator error: {0}")]
    Estimator(String),

    /// Persistence collaborator failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Language resolution or translation failure.
    #[error("language error: {0}")]
    Language(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A bounded operation ran out of time.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Host bridge protocol or dispatch error.
    #[error("host error: {0}")]
    Host(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MoodError>;
