//! Team configuration.

use serde::{Deserialize, Serialize};

use crate::task::CollaborationMode;

fn default_max_concurrent_tasks() -> usize {
    5
}

fn default_task_timeout_secs() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    256
}

fn default_name() -> String {
    "team".to_string()
}

/// Policy applied when a subtask fails in parallel mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParallelFailurePolicy {
    /// Mark the task failed, retaining every sibling result for diagnostics.
    #[default]
    FailTask,
    /// Mark the task completed; failed subtask results stay embedded in the
    /// result set.
    Tolerate,
}

/// Configuration for one coordinated agent team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default = "default_name")]
    pub name: String,

    /// Upper bound on tasks executing concurrently.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Default collaboration mode handed to the planner.
    #[serde(default)]
    pub collaboration_mode: CollaborationMode,

    /// Overall deadline for a single task, including all of its subtasks.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Capacity of the message delivery and task queues.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub parallel_failure_policy: ParallelFailurePolicy,
}

impl TeamConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: CollaborationMode) -> Self {
        self.collaboration_mode = mode;
        self
    }

    pub fn with_task_timeout_secs(mut self, secs: u64) -> Self {
        self.task_timeout_secs = secs;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    pub fn with_parallel_failure_policy(mut self, policy: ParallelFailurePolicy) -> Self {
        self.parallel_failure_policy = policy;
        self
    }
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            collaboration_mode: CollaborationMode::default(),
            task_timeout_secs: default_task_timeout_secs(),
            channel_capacity: default_channel_capacity(),
            parallel_failure_policy: ParallelFailurePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TeamConfig::default();
        assert_eq!(config.name, "team");
        assert_eq!(config.max_concurrent_tasks, 5);
        assert_eq!(config.task_timeout_secs, 30);
        assert_eq!(config.channel_capacity, 256);
        assert_eq!(config.collaboration_mode, CollaborationMode::Parallel);
        assert_eq!(
            config.parallel_failure_policy,
            ParallelFailurePolicy::FailTask
        );
    }

    #[test]
    fn test_builder_methods() {
        let config = TeamConfig::new("review-team")
            .with_mode(CollaborationMode::Sequential)
            .with_task_timeout_secs(120)
            .with_max_concurrent_tasks(2);

        assert_eq!(config.name, "review-team");
        assert_eq!(config.collaboration_mode, CollaborationMode::Sequential);
        assert_eq!(config.task_timeout_secs, 120);
        assert_eq!(config.max_concurrent_tasks, 2);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: TeamConfig = serde_json::from_str(r#"{"name": "ops"}"#).unwrap();
        assert_eq!(config.name, "ops");
        assert_eq!(config.max_concurrent_tasks, 5);
        assert_eq!(config.collaboration_mode, CollaborationMode::Parallel);
    }
}
