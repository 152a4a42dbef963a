#[cfg(feature = "memory")]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::{
    types::{AgentId, ErrorRecord, MessagePriority, QueueEntry, QueueEvent, QueueId},
    QueueResult,
};

/// Type alias for boxed streams (stable Rust compatible)
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Per-target counts by status, computed live from the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub processing: usize,
    pub delivered: usize,
    pub failed: usize,
    pub expired: usize,
}

impl StatusCounts {
    /// Total entries across all statuses
    pub fn total(&self) -> usize {
        self.queued + self.processing + self.delivered + self.failed + self.expired
    }
}

/// Durable persistence seam for queue entries
///
/// The store holds the single source of truth. Every mutation of one entry
/// happens under one lock (read-modify-write on a single entry never races
/// with another updater of that entry). Queue semantics - ordering, locks,
/// backoff, TTL defaults - live in the engine, not here.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist a freshly created entry
    async fn insert(&self, entry: QueueEntry) -> QueueResult<()>;

    /// Fetch one entry by ID
    async fn get(&self, id: &QueueId) -> QueueResult<QueueEntry>;

    /// Count queued entries for `target` with strictly higher priority
    ///
    /// Feeds the queue-position computation: position is priority-class
    /// relative, same-priority entries are deliberately not counted.
    async fn count_queued_above(
        &self,
        target: &AgentId,
        priority: MessagePriority,
    ) -> QueueResult<usize>;

    /// Atomically select and claim the next eligible batch for `target`
    ///
    /// Eligible: `Queued`, `scheduled_for <= now`, `expires_at > now`.
    /// Ordered by priority descending then `scheduled_for` ascending, capped
    /// at `limit`. Each returned entry has been transitioned to `Processing`
    /// with `processed_at = now`. Entries observed past their deadline are
    /// corrected to `Expired` on the way.
    async fn take_eligible(
        &self,
        target: &AgentId,
        limit: usize,
        now: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>>;

    /// Mark an entry delivered, recording confirmation state
    async fn mark_delivered(&self, id: &QueueId, response_received: bool) -> QueueResult<()>;

    /// Append an error record and mark the entry failed
    async fn mark_failed(&self, id: &QueueId, error: ErrorRecord) -> QueueResult<()>;

    /// Re-queue a failed entry for retry at `retry_at` (increments retry count)
    async fn schedule_retry(&self, id: &QueueId, retry_at: DateTime<Utc>) -> QueueResult<()>;

    /// Fetch failed entries still worth retrying, optionally for one target
    ///
    /// Worth retrying: `Failed`, `retry_count < max_retries`, unexpired at `now`.
    async fn failed_retryable(
        &self,
        target: Option<&AgentId>,
        now: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>>;

    /// Count failed entries, optionally for one target
    async fn count_failed(&self, target: Option<&AgentId>) -> QueueResult<usize>;

    /// Mark expired then delete everything past its deadline
    ///
    /// Removes entries with `status = Expired` or `expires_at < now`,
    /// regardless of other status. Returns the number deleted.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> QueueResult<usize>;

    /// Live counts by status for one target
    async fn status_counts(&self, target: &AgentId) -> QueueResult<StatusCounts>;

    /// Priorities of currently queued entries for one target
    ///
    /// Feeds the estimated-processing-time aggregation without cloning bodies.
    async fn queued_snapshot(&self, target: &AgentId) -> QueueResult<Vec<MessagePriority>>;

    /// Lifecycle event stream for observability (boxed for stable Rust)
    fn event_stream(&self) -> BoxStream<QueueEvent>;
}
