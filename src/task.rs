//! Task, subtask, and execution plan types.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a task. Owned exclusively by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Planned,
    Executing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// How a task's subtasks are driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationMode {
    #[default]
    Parallel,
    Sequential,
}

/// Machine-readable reason recorded on a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    SubtaskFailed,
    PlanningFailed,
    NoCandidate,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::SubtaskFailed => "subtask_failed",
            Self::PlanningFailed => "planning_failed",
            Self::NoCandidate => "no_candidate",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work inside an execution plan. Assigned to exactly one agent
/// per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,

    /// Position in the plan; drives ordering in sequential mode and result
    /// aggregation in both modes.
    pub index: usize,

    pub description: String,

    /// Capabilities this subtask needs. Empty means the owning task's
    /// requirements apply.
    #[serde(default)]
    pub required_capabilities: HashSet<String>,

    /// Pre-bound agent, if the planner already chose one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
}

impl Subtask {
    pub fn new(index: usize, description: impl Into<String>) -> Self {
        Self {
            id: format!("sub_{}", Uuid::new_v4()),
            index,
            description: description.into(),
            required_capabilities: HashSet::new(),
            assigned_agent: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: HashSet<String>) -> Self {
        self.required_capabilities = capabilities;
        self
    }

    pub fn bound_to(mut self, agent_id: impl Into<String>) -> Self {
        self.assigned_agent = Some(agent_id.into());
        self
    }
}

/// Ordered sequence of subtasks plus the collaboration mode driving them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub mode: CollaborationMode,
    pub subtasks: Vec<Subtask>,
}

impl ExecutionPlan {
    pub fn new(mode: CollaborationMode) -> Self {
        Self {
            mode,
            subtasks: Vec::new(),
        }
    }

    pub fn with_subtask(mut self, subtask: Subtask) -> Self {
        self.subtasks.push(subtask);
        self
    }

    pub fn len(&self) -> usize {
        self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtasks.is_empty()
    }
}

/// Result from one subtask execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskResult {
    pub subtask_id: String,
    pub agent_id: String,
    pub success: bool,
    pub output: String,
}

impl SubtaskResult {
    pub fn success(
        subtask_id: impl Into<String>,
        agent_id: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            subtask_id: subtask_id.into(),
            agent_id: agent_id.into(),
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(
        subtask_id: impl Into<String>,
        agent_id: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            subtask_id: subtask_id.into(),
            agent_id: agent_id.into(),
            success: false,
            output: output.into(),
        }
    }
}

/// A task submitted to the team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    /// Opaque task description handed through to agents.
    pub description: String,

    /// Capabilities an agent must have to be assigned this task.
    #[serde(default)]
    pub required_capabilities: HashSet<String>,

    pub status: TaskStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<ExecutionPlan>,

    /// Aggregated subtask results, in plan order once terminal.
    #[serde(default)]
    pub results: Vec<SubtaskResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,

    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: format!("task_{}", Uuid::new_v4()),
            description: description.into(),
            required_capabilities: HashSet::new(),
            status: TaskStatus::Pending,
            plan: None,
            results: Vec::new(),
            failure: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: HashSet<String>) -> Self {
        self.required_capabilities = capabilities;
        self
    }

    /// Load units this task contributes to an agent's workload: a planned
    /// task weighs one unit per subtask (at least one), an unplanned task
    /// weighs one unit.
    pub fn estimated_load(&self) -> f64 {
        self.plan
            .as_ref()
            .map(|plan| plan.subtasks.len().max(1) as f64)
            .unwrap_or(1.0)
    }
}
