use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AgentId, ErrorKind, MessageContent, MessagePriority, MessageType, QueueId};

/// Queue entry status lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Entry is queued and waiting to be processed
    Queued,

    /// Entry is currently held by a processing pass
    Processing,

    /// Entry was delivered to the target (terminal)
    Delivered,

    /// Delivery failed; may re-enter Queued while retries remain
    Failed,

    /// Entry outlived its deadline (terminal)
    Expired,
}

impl MessageStatus {
    /// Check if the status is terminal (delivered or expired)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Expired)
    }

    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One failure observed while handling an entry - the log is append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// When the failure was observed
    pub at: DateTime<Utc>,

    /// Failure classification
    pub kind: ErrorKind,

    /// Human-readable description
    pub message: String,

    /// Optional structured details
    pub details: Option<serde_json::Value>,
}

impl ErrorRecord {
    /// Record a failure observed now
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
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
}

/// Delivery confirmation tracking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfirmation {
    /// Whether delivery was confirmed
    pub confirmed: bool,

    /// When delivery was confirmed
    pub confirmed_at: Option<DateTime<Utc>>,

    /// Whether the target produced a response
    pub response_received: bool,

    /// When the response arrived
    pub response_at: Option<DateTime<Utc>>,
}

/// Queue entry - the sole persisted entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique identifier, assigned at creation, immutable
    pub queue_id: QueueId,

    /// Recipient agent (also the mutual-exclusion key)
    pub target_id: AgentId,

    /// Sending agent
    pub from_id: AgentId,

    /// Kind of message
    pub message_type: MessageType,

    /// Priority for dequeue ordering
    pub priority: MessagePriority,

    /// Immutable message body
    pub content: MessageContent,

    /// Current lifecycle status
    pub status: MessageStatus,

    /// Completed retry attempts (never exceeds max_retries)
    pub retry_count: u32,

    /// Maximum retry attempts
    pub max_retries: u32,

    /// Earliest eligible processing time
    pub scheduled_for: DateTime<Utc>,

    /// Deadline after which the entry must never be delivered
    pub expires_at: DateTime<Utc>,

    /// When the entry was created
    pub created_at: DateTime<Utc>,

    /// When the entry was last updated
    pub updated_at: DateTime<Utc>,

    /// When the entry last entered Processing
    pub processed_at: Option<DateTime<Utc>>,

    /// When the entry was delivered (set iff status is Delivered)
    pub delivered_at: Option<DateTime<Utc>>,

    /// Append-only log of observed failures
    pub errors: Vec<ErrorRecord>,

    /// Delivery confirmation tracking
    pub delivery_confirmation: DeliveryConfirmation,
}

impl QueueEntry {
    /// Create a new queued entry
    ///
    /// Defaulting of `scheduled_for`, `expires_at` and `max_retries` is the
    /// enqueuer's job; by the time an entry exists all three are resolved.
    pub fn new(
        target_id: AgentId,
        from_id: AgentId,
        message_type: MessageType,
        priority: MessagePriority,
        content: MessageContent,
        scheduled_for: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            queue_id: QueueId::new(),
            target_id,
            from_id,
            message_type,
            priority,
            content,
            status: MessageStatus::Queued,
            retry_count: 0,
            max_retries,
            scheduled_for,
            expires_at,
            created_at: now,
            updated_at: now,
            processed_at: None,
            delivered_at: None,
            errors: Vec::new(),
            delivery_confirmation: DeliveryConfirmation::default(),
        }
    }

    /// Check if the entry is eligible for dequeue at `now`
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == MessageStatus::Queued && self.scheduled_for <= now && self.expires_at > now
    }

    /// Check if the entry has outlived its deadline
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Check if the entry may still be retried
    pub fn can_retry(&self) -> bool {
        self.status == MessageStatus::Failed && self.retry_count < self.max_retries
    }

    /// Begin a processing pass
    pub fn start_processing(&mut self, now: DateTime<Utc>) {
        self.status = MessageStatus::Processing;
        self.processed_at = Some(now);
        self.updated_at = now;
    }

    /// Mark the entry delivered (terminal)
    pub fn deliver(&mut self, now: DateTime<Utc>, response_received: bool) {
        self.status = MessageStatus::Delivered;
        self.delivered_at = Some(now);
        self.delivery_confirmation.confirmed = true;
        self.delivery_confirmation.confirmed_at = Some(now);
        if response_received {
            self.delivery_confirmation.response_received = true;
            self.delivery_confirmation.response_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Record a failure and mark the entry failed
    pub fn fail(&mut self, error: ErrorRecord) {
        self.updated_at = error.at;
        self.errors.push(error);
        self.status = MessageStatus::Failed;
    }

    /// Re-queue a failed entry for another attempt at `retry_at`
    pub fn schedule_retry(&mut self, retry_at: DateTime<Utc>) {
        self.retry_count += 1;
        self.status = MessageStatus::Queued;
        self.scheduled_for = retry_at;
        self.updated_at = Utc::now();
    }

    /// Mark the entry expired (terminal)
    pub fn expire(&mut self) {
        self.status = MessageStatus::Expired;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageContent;
    use chrono::Duration;

    fn sample_entry() -> QueueEntry {
        let now = Utc::now();
        QueueEntry::new(
            AgentId::from("agent-b"),
            AgentId::from("agent-a"),
            MessageType::Request,
            MessagePriority::Medium,
            MessageContent::text("hello"),
            now,
            now + Duration::hours(24),
            3,
        )
    }

    #[test]
    fn test_new_entry_is_queued_and_eligible() {
        let entry = sample_entry();
        assert_eq!(entry.status, MessageStatus::Queued);
        assert_eq!(entry.retry_count, 0);
        assert!(entry.is_eligible(Utc::now()));
    }

    #[test]
    fn test_deliver_sets_confirmation() {
        let mut entry = sample_entry();
        let now = Utc::now();
        entry.start_processing(now);
        entry.deliver(now, true);

        assert_eq!(entry.status, MessageStatus::Delivered);
        assert_eq!(entry.delivered_at, Some(now));
        assert!(entry.delivery_confirmation.confirmed);
        assert!(entry.delivery_confirmation.response_received);
        assert!(entry.status.is_terminal());
    }

    #[test]
    fn test_fail_appends_error_log() {
        let mut entry = sample_entry();
        entry.fail(ErrorRecord::new(ErrorKind::Network, "unreachable"));
        entry.fail(ErrorRecord::new(ErrorKind::Timeout, "slow"));

        assert_eq!(entry.status, MessageStatus::Failed);
        assert_eq!(entry.errors.len(), 2);
        assert_eq!(entry.errors[0].kind, ErrorKind::Network);
        assert_eq!(entry.errors[1].kind, ErrorKind::Timeout);
    }

    #[test]
    fn test_retry_bound() {
        let mut entry = sample_entry();
        entry.max_retries = 2;

        entry.fail(ErrorRecord::new(ErrorKind::System, "boom"));
        assert!(entry.can_retry());
        entry.schedule_retry(Utc::now());
        assert_eq!(entry.retry_count, 1);

        entry.fail(ErrorRecord::new(ErrorKind::System, "boom"));
        assert!(entry.can_retry());
        entry.schedule_retry(Utc::now());
        assert_eq!(entry.retry_count, 2);

        entry.fail(ErrorRecord::new(ErrorKind::System, "boom"));
        assert!(!entry.can_retry());
    }

    #[test]
    fn test_expired_entry_not_eligible() {
        let mut entry = sample_entry();
        entry.expires_at = Utc::now() - Duration::seconds(1);
        assert!(!entry.is_eligible(Utc::now()));
        assert!(entry.is_past_expiry(Utc::now()));
    }
}
