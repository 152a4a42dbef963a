use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::QueueConfig,
    handler::MessageHandler,
    lock::LockTable,
    registry::AgentRegistry,
    stats::{GlobalStatistics, QueueStatistics, StatsRecorder},
    store::{BoxStream, QueueStore},
    types::{AgentId, ErrorRecord, MessageDraft, MessagePriority, QueueEntry, QueueEvent, QueueId},
    QueueError, QueueResult,
};

/// What the sender gets back from a successful enqueue
#[derive(Debug, Clone)]
pub struct EnqueueReceipt {
    /// Identifier of the persisted entry
    pub queue_id: QueueId,

    /// 1 + count of strictly-higher-priority queued entries for the target
    ///
    /// Priority-class relative by contract - same-priority entries ahead in
    /// schedule order are not counted.
    pub queue_position: usize,

    /// Rough delivery estimate derived from position and priority
    pub estimated_delivery: DateTime<Utc>,
}

/// Outcome of one processing pass over a target's queue
#[derive(Debug, Clone, Default)]
pub struct ProcessingReport {
    pub processed: usize,
    pub delivered: usize,
    pub failed: usize,

    /// Entries that went terminal or vanished under the pass (reaper or
    /// stuck-lock reclaim racing the batch) and were skipped
    pub skipped: usize,

    pub elapsed: Duration,
}

/// Outcome of one retry sweep
#[derive(Debug, Clone, Default)]
pub struct RetryReport {
    /// Entries moved back to queued with a backoff schedule
    pub retried: usize,

    /// All failed entries visible at sweep time, retryable or not
    pub total_failed: usize,
}

// An in-flight entry deleted by the expiration sweep or flipped terminal
// after a stuck-lock reclaim surfaces as one of these from the mark calls.
fn entry_lost_to_race(e: &QueueError) -> bool {
    matches!(
        e,
        QueueError::EntryNotFound(_) | QueueError::EntryTerminal(_)
    )
}

/// Priority-ordered message queue mediating agent-to-agent delivery
///
/// Owns the scheduling semantics: queue position, per-target mutual
/// exclusion, retry backoff, TTL defaults and statistics. Persistence is
/// delegated to a [`QueueStore`], target resolution to an [`AgentRegistry`],
/// and actual delivery to the caller's [`MessageHandler`].
pub struct MessageQueue<S: QueueStore> {
    store: Arc<S>,
    registry: Arc<dyn AgentRegistry>,
    locks: LockTable,
    stats: Arc<StatsRecorder>,
    config: QueueConfig,
}

impl<S: QueueStore> MessageQueue<S> {
    /// Create a queue with default configuration
    pub fn new(store: S, registry: Arc<dyn AgentRegistry>) -> Self {
        Self::with_config(store, registry, QueueConfig::default())
    }

    /// Create a queue with custom configuration
    pub fn with_config(store: S, registry: Arc<dyn AgentRegistry>, config: QueueConfig) -> Self {
        Self {
            store: Arc::new(store),
            registry,
            locks: LockTable::new(),
            stats: Arc::new(StatsRecorder::new()),
            config,
        }
    }

    /// Validate a draft and persist it as a queued entry
    #[instrument(skip(self, draft), fields(target_id = %target, priority = %draft.priority))]
    pub async fn enqueue(
        &self,
        target: &AgentId,
        draft: MessageDraft,
    ) -> QueueResult<EnqueueReceipt> {
        let size = draft.content_size();
        if size > self.config.max_content_len {
            return Err(QueueError::ContentTooLarge {
                size,
                max: self.config.max_content_len,
            });
        }

        let max_retries = draft.max_retries.unwrap_or(self.config.default_max_retries);
        if max_retries > self.config.max_retries_cap {
            return Err(QueueError::InvalidMaxRetries {
                requested: max_retries,
                cap: self.config.max_retries_cap,
            });
        }

        if !self.registry.exists(target).await? {
            return Err(QueueError::TargetNotFound(target.to_string()));
        }

        let now = Utc::now();
        let scheduled_for = draft.scheduled_for.unwrap_or(now);
        let expires_at = draft.expires_at.unwrap_or_else(|| {
            let ttl = if draft.priority == MessagePriority::Urgent {
                self.config.urgent_ttl
            } else {
                self.config.default_ttl
            };
            now + chrono::Duration::milliseconds(ttl.as_millis() as i64)
        });

        let queue_position = 1 + self
            .store
            .count_queued_above(target, draft.priority)
            .await?;
        let estimated_delivery = now + self.delivery_window(queue_position, draft.priority);

        let entry = QueueEntry::new(
            target.clone(),
            draft.from,
            draft.message_type,
            draft.priority,
            draft.content,
            scheduled_for,
            expires_at,
            max_retries,
        );
        let queue_id = entry.queue_id.clone();

        self.store.insert(entry).await?;

        info!(queue_id = %queue_id, position = queue_position, "enqueued message");

        Ok(EnqueueReceipt {
            queue_id,
            queue_position,
            estimated_delivery,
        })
    }

    // position * base window * priority multiplier
    fn delivery_window(&self, position: usize, priority: MessagePriority) -> chrono::Duration {
        let millis = position as f64
            * self.config.base_processing.as_secs_f64()
            * priority.delivery_multiplier()
            * 1000.0;
        chrono::Duration::milliseconds(millis as i64)
    }

    /// Claim up to `limit` eligible entries for `target`
    ///
    /// Non-blocking against the per-target lock: when a processing pass is
    /// already in flight the result is immediately empty. A non-empty batch
    /// leaves the lock held; the caller releases it via
    /// [`release_target`](Self::release_target) once done (which
    /// [`process_queued_messages`](Self::process_queued_messages) does on
    /// every path). An empty batch releases the lock before returning.
    #[instrument(skip(self), fields(target_id = %target))]
    pub async fn dequeue(&self, target: &AgentId, limit: usize) -> QueueResult<Vec<QueueEntry>> {
        if !self.locks.try_acquire(target) {
            debug!("target already locked by another processing pass");
            return Ok(Vec::new());
        }

        let batch = match self.store.take_eligible(target, limit, Utc::now()).await {
            Ok(batch) => batch,
            Err(e) => {
                self.locks.release(target);
                return Err(e);
            }
        };

        if batch.is_empty() {
            self.locks.release(target);
            return Ok(batch);
        }

        debug!(count = batch.len(), "dequeued batch, lock held");
        Ok(batch)
    }

    /// Release the processing lock for `target`; returns whether it was held
    pub fn release_target(&self, target: &AgentId) -> bool {
        self.locks.release(target)
    }

    /// Dequeue a batch and drive the handler over it
    ///
    /// Handler failures never propagate: each one is recorded on its entry
    /// and the pass moves on. The expiration sweep and the stuck-lock
    /// reclaim run without the per-target lock, so an in-flight entry can
    /// go terminal or vanish under the pass; those entries are skipped
    /// rather than aborting the batch. The per-target lock is released on
    /// every exit path, store errors included.
    #[instrument(skip(self, handler), fields(target_id = %target))]
    pub async fn process_queued_messages<H>(
        &self,
        target: &AgentId,
        handler: &H,
    ) -> QueueResult<ProcessingReport>
    where
        H: MessageHandler + ?Sized,
    {
        let started = Instant::now();

        let batch = self
            .dequeue(target, self.config.dequeue_batch_limit)
            .await?;
        if batch.is_empty() {
            // Lock is not held on the empty path; nothing to release.
            return Ok(ProcessingReport::default());
        }

        let _lock = self.locks.adopt(target.clone());

        let mut delivered = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let processed = batch.len();

        for entry in batch {
            let entry_started = Instant::now();
            let outcome = handler.handle(&entry).await;
            let elapsed_ms = entry_started.elapsed().as_secs_f64() * 1000.0;

            match outcome {
                Ok(delivery) => {
                    match self
                        .store
                        .mark_delivered(&entry.queue_id, delivery.response_received)
                        .await
                    {
                        Ok(()) => {
                            self.stats.record_delivered(elapsed_ms);
                            delivered += 1;
                            debug!(queue_id = %entry.queue_id, "message delivered");
                        }
                        Err(e) if entry_lost_to_race(&e) => {
                            skipped += 1;
                            warn!(queue_id = %entry.queue_id, "entry gone mid-pass, skipped: {}", e);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(handler_error) => {
                    let mut record =
                        ErrorRecord::new(handler_error.kind, handler_error.message.clone());
                    if let Some(details) = handler_error.details {
                        record = record.with_details(details);
                    }
                    match self.store.mark_failed(&entry.queue_id, record).await {
                        Ok(()) => {
                            self.stats.record_failed(elapsed_ms);
                            failed += 1;
                            warn!(
                                queue_id = %entry.queue_id,
                                kind = %handler_error.kind,
                                "message delivery failed: {}",
                                handler_error.message
                            );
                        }
                        Err(e) if entry_lost_to_race(&e) => {
                            skipped += 1;
                            warn!(queue_id = %entry.queue_id, "entry gone mid-pass, skipped: {}", e);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        let report = ProcessingReport {
            processed,
            delivered,
            failed,
            skipped,
            elapsed: started.elapsed(),
        };
        info!(
            processed = report.processed,
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            "processing pass complete"
        );
        Ok(report)
    }

    /// Move failed-but-retryable entries back to queued with backoff
    ///
    /// Entries out of retry headroom stay failed until the expiration sweep
    /// takes them; they surface only through statistics and queries.
    #[instrument(skip(self))]
    pub async fn retry_failed_messages(
        &self,
        target: Option<&AgentId>,
    ) -> QueueResult<RetryReport> {
        let now = Utc::now();
        let total_failed = self.store.count_failed(target).await?;
        let candidates = self.store.failed_retryable(target, now).await?;

        let mut retried = 0;
        for entry in candidates {
            let retry_at = now + self.backoff(entry.retry_count + 1);
            self.store.schedule_retry(&entry.queue_id, retry_at).await?;
            retried += 1;
            debug!(
                queue_id = %entry.queue_id,
                retry_count = entry.retry_count + 1,
                retry_at = %retry_at,
                "rescheduled failed message"
            );
        }

        if retried > 0 {
            info!(retried, total_failed, "retry sweep complete");
        }

        Ok(RetryReport {
            retried,
            total_failed,
        })
    }

    // 5, 10, 20, 40... minutes for retry counts 1, 2, 3, 4
    fn backoff(&self, retry_count: u32) -> chrono::Duration {
        let base = self.config.backoff_base * 2u32.pow(retry_count.saturating_sub(1));
        chrono::Duration::milliseconds(base.as_millis() as i64)
    }

    /// Purge everything past its deadline; returns the number deleted
    #[instrument(skip(self))]
    pub async fn cleanup_expired_messages(&self) -> QueueResult<usize> {
        let deleted = self.store.sweep_expired(Utc::now()).await?;
        if deleted > 0 {
            info!(deleted, "expired messages purged");
        }
        Ok(deleted)
    }

    /// Reclaim processing locks whose targets have gone quiet
    ///
    /// A crashed or hung handler leaves the target's lock set forever and
    /// starves its queue. Any held lock whose target was last active more
    /// than the staleness threshold ago (or is unknown to the registry) is
    /// force-released. The in-flight handler, if any, is not cancelled -
    /// only the scheduling lock is cleared.
    #[instrument(skip(self))]
    pub async fn perform_health_check(&self) -> QueueResult<usize> {
        let now = Utc::now();
        let stale_after =
            chrono::Duration::milliseconds(self.config.lock_stale_after.as_millis() as i64);

        let mut reclaimed = 0;
        for (target, held_since) in self.locks.held_targets() {
            let stale = match self.registry.last_active(&target).await? {
                Some(last_active) => now - last_active > stale_after,
                // Unknown to the registry counts as stale.
                None => true,
            };

            if stale {
                debug!(target_id = %target, held_since = %held_since, "lock target inactive");
                if self.locks.force_release(&target) {
                    reclaimed += 1;
                }
            }
        }

        Ok(reclaimed)
    }

    /// Live per-target statistics aggregated from the store
    pub async fn queue_statistics(&self, target: &AgentId) -> QueueResult<QueueStatistics> {
        let counts = self.store.status_counts(target).await?;
        let queued = self.store.queued_snapshot(target).await?;

        let estimated_processing_time: f64 = queued
            .iter()
            .map(|p| self.config.base_processing.as_secs_f64() * p.delivery_multiplier())
            .sum();

        Ok(QueueStatistics {
            queued: counts.queued,
            processing: counts.processing,
            delivered: counts.delivered,
            failed: counts.failed,
            expired: counts.expired,
            total: counts.total(),
            is_processing: self.locks.is_held(target),
            estimated_processing_time,
        })
    }

    /// Process-wide statistics from the in-memory recorder
    pub fn global_statistics(&self) -> GlobalStatistics {
        self.stats.snapshot(self.locks.len())
    }

    /// Lifecycle event stream from the store
    pub fn event_stream(&self) -> BoxStream<QueueEvent> {
        self.store.event_stream()
    }

    /// Get store reference
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get configuration
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

impl<S: QueueStore> Clone for MessageQueue<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            registry: self.registry.clone(),
            locks: self.locks.clone(),
            stats: self.stats.clone(),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use crate::store::memory::MemoryStore;
    use crate::types::{MessageContent, MessageType};

    fn queue_with_agents(agents: &[&str]) -> MessageQueue<MemoryStore> {
        let registry = StaticRegistry::new();
        for agent in agents {
            registry.register(*agent);
        }
        MessageQueue::new(MemoryStore::new(), Arc::new(registry))
    }

    fn draft(priority: MessagePriority) -> MessageDraft {
        MessageDraft::new("agent-a", MessageType::Request, MessageContent::text("hi"))
            .with_priority(priority)
    }

    #[tokio::test]
    async fn test_enqueue_unknown_target() {
        let queue = queue_with_agents(&[]);
        let result = queue
            .enqueue(&AgentId::from("ghost"), draft(MessagePriority::Medium))
            .await;
        assert!(matches!(result, Err(QueueError::TargetNotFound(_))));
    }

    #[tokio::test]
    async fn test_enqueue_rejects_oversized_content() {
        let queue = queue_with_agents(&["agent-b"]);
        let big = "x".repeat(queue.config().max_content_len + 1);
        let draft =
            MessageDraft::new("agent-a", MessageType::Request, MessageContent::text(big));

        let result = queue.enqueue(&AgentId::from("agent-b"), draft).await;
        assert!(matches!(result, Err(QueueError::ContentTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_enqueue_rejects_excessive_max_retries() {
        let queue = queue_with_agents(&["agent-b"]);
        let result = queue
            .enqueue(
                &AgentId::from("agent-b"),
                draft(MessagePriority::Medium).with_max_retries(11),
            )
            .await;
        assert!(matches!(result, Err(QueueError::InvalidMaxRetries { .. })));
    }

    #[tokio::test]
    async fn test_urgent_enqueue_position_and_estimate() {
        let queue = queue_with_agents(&["agent-b"]);
        let before = Utc::now();

        let receipt = queue
            .enqueue(&AgentId::from("agent-b"), draft(MessagePriority::Urgent))
            .await
            .unwrap();

        // First urgent message: position 1, estimate ~ now + 30s * 0.5.
        assert_eq!(receipt.queue_position, 1);
        let offset = receipt.estimated_delivery - before;
        assert!(offset >= chrono::Duration::seconds(14));
        assert!(offset <= chrono::Duration::seconds(16));
    }

    #[tokio::test]
    async fn test_queue_position_counts_only_higher_priority() {
        let queue = queue_with_agents(&["agent-b"]);
        let target = AgentId::from("agent-b");

        queue
            .enqueue(&target, draft(MessagePriority::Urgent))
            .await
            .unwrap();
        queue
            .enqueue(&target, draft(MessagePriority::Medium))
            .await
            .unwrap();

        // Same-priority entries ahead are not counted, only the urgent one.
        let receipt = queue
            .enqueue(&target, draft(MessagePriority::Medium))
            .await
            .unwrap();
        assert_eq!(receipt.queue_position, 2);
    }

    #[tokio::test]
    async fn test_urgent_default_ttl_is_short() {
        let queue = queue_with_agents(&["agent-b"]);
        let target = AgentId::from("agent-b");

        let urgent = queue
            .enqueue(&target, draft(MessagePriority::Urgent))
            .await
            .unwrap();
        let medium = queue
            .enqueue(&target, draft(MessagePriority::Medium))
            .await
            .unwrap();

        let urgent_entry = queue.store().get(&urgent.queue_id).await.unwrap();
        let medium_entry = queue.store().get(&medium.queue_id).await.unwrap();

        let urgent_ttl = urgent_entry.expires_at - urgent_entry.created_at;
        let medium_ttl = medium_entry.expires_at - medium_entry.created_at;
        assert!(urgent_ttl <= chrono::Duration::hours(1) + chrono::Duration::seconds(5));
        assert!(medium_ttl >= chrono::Duration::hours(23));
    }

    #[tokio::test]
    async fn test_backoff_series() {
        let queue = queue_with_agents(&[]);
        assert_eq!(queue.backoff(1), chrono::Duration::minutes(5));
        assert_eq!(queue.backoff(2), chrono::Duration::minutes(10));
        assert_eq!(queue.backoff(3), chrono::Duration::minutes(20));
        assert_eq!(queue.backoff(4), chrono::Duration::minutes(40));
    }
}
