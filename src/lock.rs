use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::warn;

use crate::types::AgentId;

/// Per-target mutual exclusion for processing passes
///
/// Process-local: the flags live in this process's memory only. For a
/// multi-worker deployment the equivalent guarantee needs a store-backed
/// lease with a TTL keyed by target; this table is the single-node
/// implementation.
#[derive(Clone, Default)]
pub struct LockTable {
    held: Arc<Mutex<HashMap<AgentId, DateTime<Utc>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the lock for `target`; never blocks
    ///
    /// Returns false when a processing pass already holds it.
    pub fn try_acquire(&self, target: &AgentId) -> bool {
        let mut held = self.held.lock();
        if held.contains_key(target) {
            return false;
        }
        held.insert(target.clone(), Utc::now());
        true
    }

    /// Release the lock for `target`; returns whether it was held
    pub fn release(&self, target: &AgentId) -> bool {
        self.held.lock().remove(target).is_some()
    }

    /// Forcibly release a lock someone else acquired (stuck-lock reclaim)
    pub fn force_release(&self, target: &AgentId) -> bool {
        let released = self.release(target);
        if released {
            warn!(target_id = %target, "force-released stuck processing lock");
        }
        released
    }

    /// Whether a processing pass currently holds `target`
    pub fn is_held(&self, target: &AgentId) -> bool {
        self.held.lock().contains_key(target)
    }

    /// When the lock for `target` was acquired, if held
    pub fn held_since(&self, target: &AgentId) -> Option<DateTime<Utc>> {
        self.held.lock().get(target).copied()
    }

    /// All currently held locks with their acquisition times
    pub fn held_targets(&self) -> Vec<(AgentId, DateTime<Utc>)> {
        self.held
            .lock()
            .iter()
            .map(|(target, since)| (target.clone(), *since))
            .collect()
    }

    /// Number of locks currently held
    pub fn len(&self) -> usize {
        self.held.lock().len()
    }

    /// Whether no locks are held
    pub fn is_empty(&self) -> bool {
        self.held.lock().is_empty()
    }

    /// Wrap an already-held lock in a guard that releases on drop
    ///
    /// Used by the processor so the lock is released on every exit path,
    /// handler failures included.
    pub fn adopt(&self, target: AgentId) -> LockGuard {
        LockGuard {
            table: self.clone(),
            target,
        }
    }
}

/// Drop guard for a held per-target lock
pub struct LockGuard {
    table: LockTable,
    target: AgentId,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.table.release(&self.target);
    }
}
