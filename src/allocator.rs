//! Allocation scoring: picks the best-fit agent for a unit of work.
//!
//! All functions here are pure over the snapshots they receive; callers
//! update workload after accepting an allocation.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::agent::AgentStatus;
use crate::task::Task;
use crate::trackers::PerformanceTracker;

/// Per-candidate score components. Combined with fixed weights.
#[derive(Debug, Clone, Copy)]
pub struct ScoreBreakdown {
    pub capability: f64,
    pub workload: f64,
    pub performance: f64,
}

impl ScoreBreakdown {
    pub const CAPABILITY_WEIGHT: f64 = 0.4;
    pub const WORKLOAD_WEIGHT: f64 = 0.3;
    pub const PERFORMANCE_WEIGHT: f64 = 0.3;

    pub fn combined(&self) -> f64 {
        self.capability * Self::CAPABILITY_WEIGHT
            + self.workload * Self::WORKLOAD_WEIGHT
            + self.performance * Self::PERFORMANCE_WEIGHT
    }
}

/// A chosen agent plus the score that selected it, for observability.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub agent_id: String,
    pub score: ScoreBreakdown,
}

/// Fraction of required capabilities the agent covers; 1.0 when nothing is
/// required.
pub fn capability_score(capabilities: &HashSet<String>, required: &HashSet<String>) -> f64 {
    if required.is_empty() {
        return 1.0;
    }
    capabilities.intersection(required).count() as f64 / required.len() as f64
}

/// Strictly decreasing in load, bounded in (0, 1].
pub fn workload_score(load: f64) -> f64 {
    1.0 / (1.0 + load)
}

/// Select the best agent for a unit of work.
///
/// Agents that are unavailable or missing any required capability are
/// filtered out before scoring. Candidates are visited in agent-id
/// ascending order; only a strictly higher combined score displaces the
/// current best, so ties resolve to the lowest agent id and repeated calls
/// over identical snapshots return the same agent.
pub fn select_agent(
    required: &HashSet<String>,
    statuses: &HashMap<String, AgentStatus>,
    workloads: &HashMap<String, f64>,
    performance: &PerformanceTracker,
) -> Option<Allocation> {
    let mut ids: Vec<&String> = statuses.keys().collect();
    ids.sort();

    let mut best: Option<Allocation> = None;
    for id in ids {
        let status = &statuses[id];
        if !status.available || !required.is_subset(&status.capabilities) {
            continue;
        }

        let score = ScoreBreakdown {
            capability: capability_score(&status.capabilities, required),
            workload: workload_score(workloads.get(id.as_str()).copied().unwrap_or(0.0)),
            performance: performance.score(id),
        };

        let better = best
            .as_ref()
            .map_or(true, |current| score.combined() > current.score.combined());
        if better {
            best = Some(Allocation {
                agent_id: id.clone(),
                score,
            });
        }
    }
    best
}

/// One task's allocation inputs for batch processing.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub task_id: String,
    pub required_capabilities: HashSet<String>,
    pub estimated_load: f64,
}

impl AllocationRequest {
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            required_capabilities: task.required_capabilities.clone(),
            estimated_load: task.estimated_load(),
        }
    }
}

/// Allocate a batch of tasks, in input order, against a working workload
/// snapshot that accumulates each accepted assignment's estimated load.
/// Later tasks therefore observe the load created by earlier ones, which
/// keeps one agent from absorbing a whole batch. Tasks with no eligible
/// agent are skipped.
pub fn allocate_all(
    requests: &[AllocationRequest],
    statuses: &HashMap<String, AgentStatus>,
    workloads: &HashMap<String, f64>,
    performance: &PerformanceTracker,
) -> HashMap<String, Vec<String>> {
    let mut working = workloads.clone();
    let mut allocations: HashMap<String, Vec<String>> = HashMap::new();

    for request in requests {
        match select_agent(
            &request.required_capabilities,
            statuses,
            &working,
            performance,
        ) {
            Some(allocation) => {
                debug!(
                    task_id = %request.task_id,
                    agent_id = %allocation.agent_id,
                    combined = allocation.score.combined(),
                    "Batch allocation"
                );
                *working.entry(allocation.agent_id.clone()).or_insert(0.0) +=
                    request.estimated_load;
                allocations
                    .entry(allocation.agent_id)
                    .or_default()
                    .push(request.task_id.clone());
            }
            None => {
                debug!(task_id = %request.task_id, "No eligible agent for task");
            }
        }
    }

    allocations
}
