use async_trait::async_trait;

use crate::types::{Delivery, HandlerError, QueueEntry};

/// Callback driven once per dequeued entry
///
/// Supplied by the agent-communication layer. A returned `Err` is the
/// failure path: its [`ErrorKind`](crate::types::ErrorKind) lands in the
/// entry's error log and decides nothing about retry eligibility - that is
/// the retry sweep's job.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Attempt delivery of one entry to its target
    async fn handle(&self, entry: &QueueEntry) -> Result<Delivery, HandlerError>;
}
