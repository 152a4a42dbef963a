use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Per-target statistics, aggregated live from the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStatistics {
    pub queued: usize,
    pub processing: usize,
    pub delivered: usize,
    pub failed: usize,
    pub expired: usize,
    pub total: usize,

    /// Whether a processing pass currently holds the target's lock
    pub is_processing: bool,

    /// Estimated seconds to drain the queued backlog
    pub estimated_processing_time: f64,
}

/// Process-wide statistics, maintained incrementally in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalStatistics {
    pub messages_processed: u64,
    pub messages_delivered: u64,
    pub messages_failed: u64,

    /// Running average per-message handling time, milliseconds
    pub average_processing_time: f64,

    /// Targets with a processing pass in flight right now
    pub active_processing_queues: usize,

    /// delivered / processed; 0 when nothing processed yet
    pub success_rate: f64,
}

/// Running counters for processing outcomes
///
/// Process-scoped and ephemeral: survives nothing across restarts. Durable
/// counts always come from the store; this is the cheap in-memory layer for
/// the operator-facing global view.
#[derive(Default)]
pub struct StatsRecorder {
    processed: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,

    /// Incremental mean of per-message handling time in milliseconds
    average_ms: Mutex<f64>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one delivered message and its handling latency
    pub fn record_delivered(&self, elapsed_ms: f64) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.record_sample(elapsed_ms);
    }

    /// Record one failed message and its handling latency
    pub fn record_failed(&self, elapsed_ms: f64) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record_sample(elapsed_ms);
    }

    // avg' = (avg * (n - 1) + sample) / n over delivered + failed
    fn record_sample(&self, elapsed_ms: f64) {
        let mut avg = self.average_ms.lock();
        // Counter bump under the lock keeps n in step with the mean update.
        let n = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        *avg = (*avg * (n - 1) as f64 + elapsed_ms) / n as f64;
    }

    pub fn messages_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn messages_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn messages_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn average_processing_time(&self) -> f64 {
        *self.average_ms.lock()
    }

    /// delivered / processed; 0 when nothing processed yet
    pub fn success_rate(&self) -> f64 {
        let processed = self.messages_processed();
        if processed == 0 {
            return 0.0;
        }
        self.messages_delivered() as f64 / processed as f64
    }

    /// Snapshot the global view
    pub fn snapshot(&self, active_processing_queues: usize) -> GlobalStatistics {
        GlobalStatistics {
            messages_processed: self.messages_processed(),
            messages_delivered: self.messages_delivered(),
            messages_failed: self.messages_failed(),
            average_processing_time: self.average_processing_time(),
            active_processing_queues,
            success_rate: self.success_rate(),
        }
    }
}
