use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{types::AgentId, QueueResult};

/// Resolves whether a target agent exists and how recently it was active
///
/// The queue only ever consults this boundary; how agents register and
/// heartbeat is the calling layer's business.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Whether `agent` currently exists and is reachable
    async fn exists(&self, agent: &AgentId) -> QueueResult<bool>;

    /// When `agent` was last seen active, if known
    async fn last_active(&self, agent: &AgentId) -> QueueResult<Option<DateTime<Utc>>>;
}

/// In-memory registry for single-node deployments and tests
#[derive(Default)]
pub struct StaticRegistry {
    agents: Arc<RwLock<HashMap<AgentId, DateTime<Utc>>>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent as active now
    pub fn register(&self, agent: impl Into<AgentId>) {
        self.agents.write().insert(agent.into(), Utc::now());
    }

    /// Refresh an agent's last-active timestamp
    pub fn touch(&self, agent: &AgentId) {
        if let Some(seen) = self.agents.write().get_mut(agent) {
            *seen = Utc::now();
        }
    }

    /// Backdate an agent's last-active timestamp (test helper)
    pub fn set_last_active(&self, agent: &AgentId, at: DateTime<Utc>) {
        self.agents.write().insert(agent.clone(), at);
    }

    /// Remove an agent
    pub fn deregister(&self, agent: &AgentId) {
        self.agents.write().remove(agent);
    }
}

#[async_trait]
impl AgentRegistry for StaticRegistry {
    async fn exists(&self, agent: &AgentId) -> QueueResult<bool> {
        Ok(self.agents.read().contains_key(agent))
    }

    async fn last_active(&self, agent: &AgentId) -> QueueResult<Option<DateTime<Utc>>> {
        Ok(self.agents.read().get(agent).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = StaticRegistry::new();
        let agent = AgentId::from("agent-a");

        assert!(!registry.exists(&agent).await.unwrap());
        registry.register("agent-a");
        assert!(registry.exists(&agent).await.unwrap());
        assert!(registry.last_active(&agent).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deregister() {
        let registry = StaticRegistry::new();
        let agent = AgentId::from("agent-a");
        registry.register("agent-a");
        registry.deregister(&agent);

        assert!(!registry.exists(&agent).await.unwrap());
        assert!(registry.last_active(&agent).await.unwrap().is_none());
    }
}
