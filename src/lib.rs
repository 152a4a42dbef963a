//! # relay-queue: Priority Messaging Between Autonomous Agents
//!
//! **Asynchronous, priority-ordered message queue for AI-to-AI communication**
//!
//! relay-queue mediates delivery of messages between autonomous agent
//! instances with the scheduling guarantees the naive "loop over an inbox"
//! approach gets wrong:
//!
//! - **Ordered scheduling**: per-target dequeue in priority-class order
//!   (urgent > high > medium > low), ascending schedule time within a class
//! - **Per-target mutual exclusion**: at most one processing pass in flight
//!   per recipient, with non-blocking contention (busy targets return empty)
//! - **Retry with exponential backoff**: failed deliveries re-queue on a
//!   5/10/20/40-minute curve until retries run out
//! - **Time-based expiration**: every entry carries a deadline; a periodic
//!   sweep purges anything past it, whatever state it is in
//! - **Stuck-lock reclaim**: a hung handler cannot starve its target's
//!   queue past the staleness threshold
//! - **Delivery confirmation + statistics**: per-target live aggregation and
//!   process-wide counters with a running latency mean
//!
//! The durable store, the agent registry and the delivery handler are all
//! trait seams; the crate ships an in-memory store and registry for
//! single-node deployments and tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relay_queue::prelude::*;
//! use relay_queue::{spawn_maintenance, MemoryStore, MessageQueue, StaticRegistry};
//!
//! struct PrintHandler;
//!
//! #[async_trait]
//! impl MessageHandler for PrintHandler {
//!     async fn handle(&self, entry: &QueueEntry) -> Result<Delivery, HandlerError> {
//!         println!("delivering {} to {}", entry.queue_id, entry.target_id);
//!         Ok(Delivery::accepted())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> QueueResult<()> {
//! let registry = StaticRegistry::new();
//! registry.register("agent-b");
//!
//! let queue = MessageQueue::new(MemoryStore::new(), Arc::new(registry));
//!
//! let draft = MessageDraft::new("agent-a", MessageType::Request, MessageContent::text("ping"))
//!     .with_priority(MessagePriority::Urgent);
//! let receipt = queue.enqueue(&AgentId::from("agent-b"), draft).await?;
//! println!("queued at position {}", receipt.queue_position);
//!
//! let report = queue
//!     .process_queued_messages(&AgentId::from("agent-b"), &PrintHandler)
//!     .await?;
//! assert_eq!(report.delivered, 1);
//!
//! // Retry, expiration and stuck-lock sweeps on background timers.
//! let maintenance = spawn_maintenance(queue.clone());
//! # maintenance.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod lock;
pub mod maintenance;
pub mod queue;
pub mod registry;
pub mod stats;
pub mod store;
pub mod types;

// Core API exports
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use handler::MessageHandler;
pub use lock::LockTable;
pub use maintenance::{spawn_maintenance, MaintenanceHandle};
pub use queue::{EnqueueReceipt, MessageQueue, ProcessingReport, RetryReport};
pub use registry::{AgentRegistry, StaticRegistry};
pub use stats::{GlobalStatistics, QueueStatistics, StatsRecorder};
pub use store::{QueueStore, StatusCounts};
pub use types::{
    AgentId, Attachment, Delivery, DeliveryConfirmation, ErrorKind, ErrorRecord, HandlerError,
    MessageContent, MessageDraft, MessagePriority, MessageStatus, MessageType, QueueEntry,
    QueueEvent, QueueId,
};

// Store implementations
#[cfg(feature = "memory")]
pub use store::memory::MemoryStore;

/// Install a basic `tracing` subscriber honoring `RUST_LOG`
///
/// Convenience for binaries embedding the queue; libraries should leave
/// subscriber setup to their host.
#[cfg(feature = "tracing-basic")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

/// Everything a typical caller needs in scope
pub mod prelude {
    // Engine and seams
    pub use crate::{AgentRegistry, MessageHandler, MessageQueue, QueueStore};

    // Essential types
    pub use crate::{
        AgentId, Delivery, ErrorKind, HandlerError, MessageContent, MessageDraft,
        MessagePriority, MessageStatus, MessageType, QueueEntry, QueueId, QueueResult,
    };

    // Statistics
    pub use crate::{GlobalStatistics, QueueStatistics};

    // Essential traits
    pub use async_trait::async_trait;
}
