use std::time::Duration;

/// Result type alias for completion calls.
pub type Result<T> = std::result::Result<T, CompletionError>;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The call exceeded its deadline. Kept distinct from provider errors:
    /// an unbounded call stalls an entire batch, so callers may want to
    /// treat timeouts differently when deciding whether to retry.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with a non-success status or a malformed body.
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider returned a success status but no usable text.
    #[error("empty completion response")]
    Empty,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
