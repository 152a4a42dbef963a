use std::time::Duration;

/// Configuration for the message queue and its maintenance timers
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum entries handed to one processing pass
    pub dequeue_batch_limit: usize,

    /// Base processing window used for delivery-time estimation
    pub base_processing: Duration,

    /// Default time-to-live for new entries
    pub default_ttl: Duration,

    /// Default time-to-live for urgent entries when none is given
    pub urgent_ttl: Duration,

    /// Default maximum retry attempts
    pub default_max_retries: u32,

    /// Hard cap on caller-supplied max retries
    pub max_retries_cap: u32,

    /// Maximum text body size in bytes
    pub max_content_len: usize,

    /// Base retry backoff (doubles per attempt)
    pub backoff_base: Duration,

    /// How often the retry sweep runs
    pub retry_sweep_interval: Duration,

    /// How often the expiration sweep runs
    pub expiry_sweep_interval: Duration,

    /// How often the stuck-lock health check runs
    pub health_check_interval: Duration,

    /// How long a target may stay inactive before its lock is reclaimed
    pub lock_stale_after: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dequeue_batch_limit: 10,
            base_processing: Duration::from_secs(30),
            default_ttl: Duration::from_secs(24 * 60 * 60),
            urgent_ttl: Duration::from_secs(60 * 60),
            default_max_retries: 3,
            max_retries_cap: 10,
            max_content_len: 16 * 1024,
            backoff_base: Duration::from_secs(5 * 60),
            retry_sweep_interval: Duration::from_secs(10 * 60),
            expiry_sweep_interval: Duration::from_secs(5 * 60),
            health_check_interval: Duration::from_secs(60),
            lock_stale_after: Duration::from_secs(10 * 60),
        }
    }
}
