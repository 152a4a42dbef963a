use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors for queue operations
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("Target agent not found: {0}")]
    TargetNotFound(String),

    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),

    #[error("Message content too large: {size} bytes (max: {max})")]
    ContentTooLarge { size: usize, max: usize },

    #[error("Invalid max retries: {requested} (cap: {cap})")]
    InvalidMaxRetries { requested: u32, cap: u32 },

    #[error("Entry is already in terminal state: {0}")]
    EntryTerminal(String),

    #[error("Agent registry error: {0}")]
    Registry(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
