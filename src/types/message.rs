use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{AgentId, MessagePriority};

/// Kind of agent-to-agent message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// A request expecting a response from the target
    Request,

    /// A response to an earlier request
    Response,

    /// Fire-and-forget notification
    Notification,

    /// System-originated message
    System,
}

impl MessageType {
    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Notification => "notification",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Reference to out-of-band content attached to a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name of the attachment
    pub name: String,

    /// Media type hint (e.g. "application/json")
    pub media_type: String,

    /// Opaque reference to where the attachment lives
    pub reference: String,
}

/// Message body - immutable once the entry is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    /// Bounded-size text body
    pub text: String,

    /// Open attribute map for caller-defined metadata
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Attachment references
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageContent {
    /// Create content with just a text body
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            text: body.into(),
            attributes: HashMap::new(),
            attachments: Vec::new(),
        }
    }

    /// Attach a caller-defined attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Attach an out-of-band reference
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Message submission data - everything the sender provides at enqueue time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDraft {
    /// Sending agent
    pub from: AgentId,

    /// Kind of message
    pub message_type: MessageType,

    /// Message body
    pub content: MessageContent,

    /// Priority for dequeue ordering
    pub priority: MessagePriority,

    /// Earliest eligible processing time (defaults to now)
    pub scheduled_for: Option<DateTime<Utc>>,

    /// Absolute deadline after which the message must never be delivered
    pub expires_at: Option<DateTime<Utc>>,

    /// Maximum retry attempts (capped, defaults from config)
    pub max_retries: Option<u32>,
}

impl MessageDraft {
    /// Create a new draft with default priority and options
    pub fn new(from: impl Into<AgentId>, message_type: MessageType, content: MessageContent) -> Self {
        Self {
            from: from.into(),
            message_type,
            content,
            priority: MessagePriority::default(),
            scheduled_for: None,
            expires_at: None,
            max_retries: None,
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the earliest processing time
    pub fn with_scheduled_for(mut self, scheduled_for: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(scheduled_for);
        self
    }

    /// Set the expiration deadline
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the maximum retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Get the text body size in bytes
    pub fn content_size(&self) -> usize {
        self.content.text.len()
    }
}
