use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::{
    store::{BoxStream, QueueStore, StatusCounts},
    types::{
        AgentId, ErrorRecord, MessagePriority, MessageStatus, QueueEntry, QueueEvent, QueueId,
    },
    QueueError, QueueResult,
};

/// In-memory store for single-node deployments and tests
pub struct MemoryStore {
    /// Queue entries indexed by queue_id
    pub(crate) entries: Arc<RwLock<HashMap<QueueId, QueueEntry>>>,

    /// Event broadcaster for observability
    pub(crate) event_broadcaster: broadcast::Sender<QueueEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (event_broadcaster, _) = broadcast::channel(1024);

        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            event_broadcaster,
        }
    }

    /// Number of entries currently held (test/inspection helper)
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Pull an entry's schedule time into the past (test helper)
    pub fn force_eligible(&self, id: &QueueId) -> QueueResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))?;
        entry.scheduled_for = Utc::now() - chrono::Duration::seconds(1);
        entry.updated_at = Utc::now();
        Ok(())
    }

    /// Force an entry's deadline into the past (test helper)
    pub fn force_expiry(&self, id: &QueueId) -> QueueResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))?;
        entry.expires_at = Utc::now() - chrono::Duration::seconds(1);
        entry.updated_at = Utc::now();
        Ok(())
    }

    fn emit(&self, event: QueueEvent) {
        let _ = self.event_broadcaster.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            event_broadcaster: self.event_broadcaster.clone(),
        }
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn insert(&self, entry: QueueEntry) -> QueueResult<()> {
        let event = QueueEvent::Enqueued {
            queue_id: entry.queue_id.clone(),
            target_id: entry.target_id.clone(),
            priority: entry.priority,
            at: Utc::now(),
        };

        self.entries.write().insert(entry.queue_id.clone(), entry);
        self.emit(event);
        Ok(())
    }

    async fn get(&self, id: &QueueId) -> QueueResult<QueueEntry> {
        let entries = self.entries.read();
        entries
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))
    }

    async fn count_queued_above(
        &self,
        target: &AgentId,
        priority: MessagePriority,
    ) -> QueueResult<usize> {
        let entries = self.entries.read();
        Ok(entries
            .values()
            .filter(|e| {
                e.target_id == *target
                    && e.status == MessageStatus::Queued
                    && e.priority > priority
            })
            .count())
    }

    async fn take_eligible(
        &self,
        target: &AgentId,
        limit: usize,
        now: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>> {
        let mut entries = self.entries.write();

        // Correct anything observed past its deadline before selection.
        for entry in entries.values_mut() {
            if entry.target_id == *target
                && entry.is_past_expiry(now)
                && entry.status != MessageStatus::Expired
                && !entry.status.is_terminal()
            {
                entry.expire();
            }
        }

        let mut eligible: Vec<QueueId> = entries
            .values()
            .filter(|e| e.target_id == *target && e.is_eligible(now))
            .map(|e| e.queue_id.clone())
            .collect();

        eligible.sort_by_key(|id| {
            let e = &entries[id];
            (Reverse(e.priority), e.scheduled_for)
        });
        eligible.truncate(limit);

        let mut batch = Vec::with_capacity(eligible.len());
        for id in eligible {
            let entry = entries.get_mut(&id).ok_or_else(|| {
                QueueError::Internal(format!("entry vanished during dequeue: {}", id))
            })?;
            entry.start_processing(now);
            batch.push(entry.clone());

            self.emit(QueueEvent::Dequeued {
                queue_id: id,
                target_id: target.clone(),
                at: now,
            });
        }

        Ok(batch)
    }

    async fn mark_delivered(&self, id: &QueueId, response_received: bool) -> QueueResult<()> {
        let now = Utc::now();
        let mut entries = self.entries.write();

        let entry = entries
            .get_mut(id)
            .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))?;

        if entry.status.is_terminal() {
            return Err(QueueError::EntryTerminal(id.to_string()));
        }

        entry.deliver(now, response_received);
        drop(entries);

        self.emit(QueueEvent::Delivered {
            queue_id: id.clone(),
            at: now,
        });
        Ok(())
    }

    async fn mark_failed(&self, id: &QueueId, error: ErrorRecord) -> QueueResult<()> {
        let mut entries = self.entries.write();

        let entry = entries
            .get_mut(id)
            .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))?;

        if entry.status.is_terminal() {
            return Err(QueueError::EntryTerminal(id.to_string()));
        }

        let event = QueueEvent::Failed {
            queue_id: id.clone(),
            kind: error.kind,
            error: error.message.clone(),
            at: error.at,
        };
        entry.fail(error);
        drop(entries);

        self.emit(event);
        Ok(())
    }

    async fn schedule_retry(&self, id: &QueueId, retry_at: DateTime<Utc>) -> QueueResult<()> {
        let mut entries = self.entries.write();

        let entry = entries
            .get_mut(id)
            .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))?;

        if entry.status.is_terminal() {
            return Err(QueueError::EntryTerminal(id.to_string()));
        }
        if !entry.can_retry() {
            return Err(QueueError::Internal(format!(
                "retries exhausted for entry: {}",
                id
            )));
        }

        entry.schedule_retry(retry_at);
        let retry_count = entry.retry_count;
        drop(entries);

        self.emit(QueueEvent::Retrying {
            queue_id: id.clone(),
            retry_at,
            retry_count,
            at: Utc::now(),
        });
        Ok(())
    }

    async fn failed_retryable(
        &self,
        target: Option<&AgentId>,
        now: DateTime<Utc>,
    ) -> QueueResult<Vec<QueueEntry>> {
        let entries = self.entries.read();
        Ok(entries
            .values()
            .filter(|e| {
                e.can_retry()
                    && e.expires_at > now
                    && target.map_or(true, |t| e.target_id == *t)
            })
            .cloned()
            .collect())
    }

    async fn count_failed(&self, target: Option<&AgentId>) -> QueueResult<usize> {
        let entries = self.entries.read();
        Ok(entries
            .values()
            .filter(|e| {
                e.status == MessageStatus::Failed && target.map_or(true, |t| e.target_id == *t)
            })
            .count())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> QueueResult<usize> {
        let mut entries = self.entries.write();

        let doomed: Vec<QueueId> = entries
            .values()
            .filter(|e| e.status == MessageStatus::Expired || e.is_past_expiry(now))
            .map(|e| e.queue_id.clone())
            .collect();

        for id in &doomed {
            if entries.remove(id).is_some() {
                self.emit(QueueEvent::Expired {
                    queue_id: id.clone(),
                    at: now,
                });
            }
        }

        Ok(doomed.len())
    }

    async fn status_counts(&self, target: &AgentId) -> QueueResult<StatusCounts> {
        let entries = self.entries.read();
        let mut counts = StatusCounts::default();

        for entry in entries.values().filter(|e| e.target_id == *target) {
            match entry.status {
                MessageStatus::Queued => counts.queued += 1,
                MessageStatus::Processing => counts.processing += 1,
                MessageStatus::Delivered => counts.delivered += 1,
                MessageStatus::Failed => counts.failed += 1,
                MessageStatus::Expired => counts.expired += 1,
            }
        }

        Ok(counts)
    }

    async fn queued_snapshot(&self, target: &AgentId) -> QueueResult<Vec<MessagePriority>> {
        let entries = self.entries.read();
        Ok(entries
            .values()
            .filter(|e| e.target_id == *target && e.status == MessageStatus::Queued)
            .map(|e| e.priority)
            .collect())
    }

    fn event_stream(&self) -> BoxStream<QueueEvent> {
        let receiver = self.event_broadcaster.subscribe();
        use tokio_stream::{wrappers::BroadcastStream, StreamExt};
        let stream = BroadcastStream::new(receiver).filter_map(|result| result.ok());

        Box::pin(stream)
    }
}
