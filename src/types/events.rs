use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AgentId, ErrorKind, MessagePriority, QueueId};

/// Minimal stable event protocol for structured observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueEvent {
    /// Entry was enqueued
    Enqueued {
        queue_id: QueueId,
        target_id: AgentId,
        priority: MessagePriority,
        at: DateTime<Utc>,
    },

    /// Entry was handed to a processing pass
    Dequeued {
        queue_id: QueueId,
        target_id: AgentId,
        at: DateTime<Utc>,
    },

    /// Entry was delivered to its target
    Delivered {
        queue_id: QueueId,
        at: DateTime<Utc>,
    },

    /// Entry failed delivery
    Failed {
        queue_id: QueueId,
        kind: ErrorKind,
        error: String,
        at: DateTime<Utc>,
    },

    /// Entry was re-queued for another attempt
    Retrying {
        queue_id: QueueId,
        retry_at: DateTime<Utc>,
        retry_count: u32,
        at: DateTime<Utc>,
    },

    /// Entry outlived its deadline and was purged
    Expired {
        queue_id: QueueId,
        at: DateTime<Utc>,
    },
}

impl QueueEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::Dequeued { .. } => "dequeued",
            Self::Delivered { .. } => "delivered",
            Self::Failed { .. } => "failed",
            Self::Retrying { .. } => "retrying",
            Self::Expired { .. } => "expired",
        }
    }

    /// Get the queue ID from any event
    pub fn queue_id(&self) -> &QueueId {
        match self {
            Self::Enqueued { queue_id, .. } => queue_id,
            Self::Dequeued { queue_id, .. } => queue_id,
            Self::Delivered { queue_id, .. } => queue_id,
            Self::Failed { queue_id, .. } => queue_id,
            Self::Retrying { queue_id, .. } => queue_id,
            Self::Expired { queue_id, .. } => queue_id,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Enqueued { at, .. } => at,
            Self::Dequeued { at, .. } => at,
            Self::Delivered { at, .. } => at,
            Self::Failed { at, .. } => at,
            Self::Retrying { at, .. } => at,
            Self::Expired { at, .. } => at,
        }
    }
}
