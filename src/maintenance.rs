use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::{queue::MessageQueue, store::QueueStore, QueueError, QueueResult};

/// Handle for the background maintenance task
pub struct MaintenanceHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Gracefully shut the maintenance task down
    pub async fn shutdown(self) -> QueueResult<()> {
        let _ = self.shutdown_tx.send(());
        self.join_handle
            .await
            .map_err(|e| QueueError::Internal(format!("maintenance join error: {}", e)))
    }
}

/// Start the three periodic sweeps on one background task
///
/// Retry sweep, expiration sweep and stuck-lock health check each tick on
/// their own interval from [`QueueConfig`](crate::QueueConfig). A failing
/// sweep is logged and the loop keeps going; nothing here propagates to
/// callers.
pub fn spawn_maintenance<S>(queue: MessageQueue<S>) -> MaintenanceHandle
where
    S: QueueStore + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let join_handle = tokio::spawn(async move {
        let config = queue.config().clone();
        let mut retry_tick = interval(config.retry_sweep_interval);
        let mut expiry_tick = interval(config.expiry_sweep_interval);
        let mut health_tick = interval(config.health_check_interval);

        // First tick of a tokio interval fires immediately; skip those so
        // startup does not run every sweep at once.
        retry_tick.tick().await;
        expiry_tick.tick().await;
        health_tick.tick().await;

        info!(
            retry_interval = ?config.retry_sweep_interval,
            expiry_interval = ?config.expiry_sweep_interval,
            health_interval = ?config.health_check_interval,
            "maintenance task started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("maintenance shutdown requested");
                    break;
                }

                _ = retry_tick.tick() => {
                    match queue.retry_failed_messages(None).await {
                        Ok(report) if report.retried > 0 => {
                            info!(retried = report.retried, "retry sweep rescheduled messages");
                        }
                        Ok(_) => debug!("retry sweep found nothing to reschedule"),
                        Err(e) => warn!("retry sweep failed: {}", e),
                    }
                }

                _ = expiry_tick.tick() => {
                    match queue.cleanup_expired_messages().await {
                        Ok(deleted) if deleted > 0 => {
                            info!(deleted, "expiration sweep purged messages");
                        }
                        Ok(_) => debug!("expiration sweep found nothing to purge"),
                        Err(e) => warn!("expiration sweep failed: {}", e),
                    }
                }

                _ = health_tick.tick() => {
                    match queue.perform_health_check().await {
                        Ok(reclaimed) if reclaimed > 0 => {
                            warn!(reclaimed, "health check reclaimed stuck locks");
                        }
                        Ok(_) => debug!("health check found no stuck locks"),
                        Err(e) => warn!("health check failed: {}", e),
                    }
                }
            }
        }

        info!("maintenance task stopped");
    });

    MaintenanceHandle {
        shutdown_tx,
        join_handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::registry::StaticRegistry;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let queue = MessageQueue::new(MemoryStore::new(), Arc::new(StaticRegistry::new()));
        let handle = spawn_maintenance(queue);

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_expiry_sweep_runs_on_interval() {
        let registry = StaticRegistry::new();
        registry.register("agent-b");

        let mut config = QueueConfig::default();
        config.expiry_sweep_interval = Duration::from_millis(20);
        // Keep the other timers quiet for the duration of the test.
        config.retry_sweep_interval = Duration::from_secs(3600);
        config.health_check_interval = Duration::from_secs(3600);

        let queue = MessageQueue::with_config(MemoryStore::new(), Arc::new(registry), config);

        let receipt = queue
            .enqueue(
                &crate::types::AgentId::from("agent-b"),
                crate::types::MessageDraft::new(
                    "agent-a",
                    crate::types::MessageType::Notification,
                    crate::types::MessageContent::text("doomed"),
                ),
            )
            .await
            .unwrap();
        queue.store().force_expiry(&receipt.queue_id).unwrap();

        let handle = spawn_maintenance(queue.clone());
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.shutdown().await.unwrap();

        assert!(queue.store().get(&receipt.queue_id).await.is_err());
    }
}
