/// Error types for the swank daemon
use thiserror::Error;

/// Result type for daemon operations
pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Wire framing error
    #[error("frame error: {0}")]
    Frame(#[from] swank_core::FrameError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),
}
