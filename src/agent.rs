//! Agent handle trait and shared agent status state.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoordError, Result};
use crate::task::{Subtask, SubtaskResult};

/// Capability-bearing worker consumed by the execution engine.
///
/// The runtime behind `process` is outside the coordination core; failures
/// surface as an error that the engine converts into a failed
/// [`SubtaskResult`].
#[async_trait]
pub trait AgentHandle: Send + Sync {
    fn id(&self) -> &str;

    fn capabilities(&self) -> HashSet<String>;

    fn available(&self) -> bool {
        true
    }

    /// Self-reported progress in `[0, 1]`.
    fn current_progress(&self) -> f64 {
        0.0
    }

    async fn process(&self, subtask: &Subtask) -> Result<SubtaskResult>;
}

/// Coordination-visible state for one known agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub capabilities: HashSet<String>,
    pub available: bool,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl AgentStatus {
    pub fn new(capabilities: HashSet<String>) -> Self {
        Self {
            capabilities,
            available: true,
            progress: 0.0,
            last_message_at: None,
        }
    }
}

/// Shared map of agent statuses. Mutation is serialized per agent id by the
/// backing shards; the router and the engine both write through here.
#[derive(Debug, Default)]
pub struct StatusBoard {
    agents: DashMap<String, AgentStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent_id: impl Into<String>, capabilities: HashSet<String>) {
        self.agents
            .insert(agent_id.into(), AgentStatus::new(capabilities));
    }

    pub fn remove(&self, agent_id: &str) -> bool {
        self.agents.remove(agent_id).is_some()
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentStatus> {
        self.agents.get(agent_id).map(|status| status.clone())
    }

    pub fn set_available(&self, agent_id: &str, available: bool) -> Result<()> {
        let mut status = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| CoordError::UnknownAgent(agent_id.to_string()))?;
        status.available = available;
        Ok(())
    }

    pub fn update_progress(&self, agent_id: &str, progress: f64) -> Result<()> {
        let mut status = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| CoordError::UnknownAgent(agent_id.to_string()))?;
        status.progress = progress.clamp(0.0, 1.0);
        Ok(())
    }

    /// Stamp `last_message_at` for a delivered message. Unknown ids are
    /// ignored so broadcast fan-out never fails mid-delivery.
    pub fn touch(&self, agent_id: &str) {
        if let Some(mut status) = self.agents.get_mut(agent_id) {
            status.last_message_at = Some(Utc::now());
        }
    }

    /// Known agent ids in ascending order. This is the iteration order the
    /// allocation scorer relies on for deterministic tie-breaking.
    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn snapshot(&self) -> HashMap<String, AgentStatus> {
        self.agents
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
