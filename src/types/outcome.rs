use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a delivery failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Transport/delivery failure
    Network,

    /// Malformed content or target
    Validation,

    /// Target refused the message
    Permission,

    /// Handler exceeded its expected duration
    Timeout,

    /// Unexpected failure (default for unclassified handler errors)
    System,
}

impl ErrorKind {
    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Permission => "permission",
            Self::Timeout => "timeout",
            Self::System => "system",
        }
    }
}

impl Default for ErrorKind {
    fn default() -> Self {
        Self::System
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Successful handler outcome
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    /// Whether the target already produced a response during handling
    pub response_received: bool,
}

impl Delivery {
    /// Plain successful delivery, no response yet
    pub fn accepted() -> Self {
        Self { response_received: false }
    }

    /// Delivery where the target responded inline
    pub fn with_response() -> Self {
        Self { response_received: true }
    }
}

/// Failed handler outcome - classified, with optional structured details
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct HandlerError {
    /// Failure classification
    pub kind: ErrorKind,

    /// Human-readable description
    pub message: String,

    /// Optional structured details for diagnostics
    pub details: Option<serde_json::Value>,
}

impl HandlerError {
    /// Create a classified handler error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Network failure shorthand
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Timeout failure shorthand
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }
}

// Unclassified failures default to the system kind.
impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(ErrorKind::System, message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(ErrorKind::System, message.to_string())
    }
}
