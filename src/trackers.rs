//! Workload and performance tracking that feeds allocation decisions.

use std::collections::HashMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One live assignment of a task or subtask to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub work_id: String,
    pub agent_id: String,
    pub load: f64,
}

/// Derives per-agent load from the set of active assignments. Keyed by the
/// task or subtask id so a finished unit of work retracts exactly its own
/// contribution.
#[derive(Debug, Default)]
pub struct WorkloadTracker {
    assignments: DashMap<String, Assignment>,
}

impl WorkloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, work_id: impl Into<String>, agent_id: impl Into<String>, load: f64) {
        let work_id = work_id.into();
        let agent_id = agent_id.into();
        debug!(work_id = %work_id, agent_id = %agent_id, load, "Assignment recorded");
        self.assignments.insert(
            work_id.clone(),
            Assignment {
                work_id,
                agent_id,
                load,
            },
        );
    }

    pub fn complete(&self, work_id: &str) -> Option<Assignment> {
        self.assignments.remove(work_id).map(|(_, a)| a)
    }

    pub fn current_load(&self, agent_id: &str) -> f64 {
        self.assignments
            .iter()
            .filter(|e| e.value().agent_id == agent_id)
            .map(|e| e.value().load)
            .sum()
    }

    /// Snapshot of per-agent load totals.
    pub fn loads(&self) -> HashMap<String, f64> {
        let mut loads: HashMap<String, f64> = HashMap::new();
        for entry in self.assignments.iter() {
            *loads.entry(entry.value().agent_id.clone()).or_insert(0.0) += entry.value().load;
        }
        loads
    }

    pub fn active_count(&self) -> usize {
        self.assignments.len()
    }
}

/// Smoothing factor for rolling metric updates.
const EMA_ALPHA: f64 = 0.3;

/// Rolling performance metrics for one agent. Absent metrics score the
/// neutral 0.5 so new agents start from the middle of the range.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub task_completion_rate: Option<f64>,
    pub quality_score: Option<f64>,
    pub cooperation_score: Option<f64>,
}

impl PerformanceRecord {
    pub const COMPLETION_WEIGHT: f64 = 0.4;
    pub const QUALITY_WEIGHT: f64 = 0.3;
    pub const COOPERATION_WEIGHT: f64 = 0.3;

    pub const NEUTRAL: f64 = 0.5;

    /// Weighted average of the metrics, each defaulting to [`Self::NEUTRAL`].
    pub fn score(&self) -> f64 {
        self.task_completion_rate.unwrap_or(Self::NEUTRAL) * Self::COMPLETION_WEIGHT
            + self.quality_score.unwrap_or(Self::NEUTRAL) * Self::QUALITY_WEIGHT
            + self.cooperation_score.unwrap_or(Self::NEUTRAL) * Self::COOPERATION_WEIGHT
    }
}

fn ema(previous: Option<f64>, observation: f64) -> f64 {
    let prev = previous.unwrap_or(PerformanceRecord::NEUTRAL);
    prev + EMA_ALPHA * (observation - prev)
}

/// Historical performance per agent, updated from task outcomes and
/// feedback messages.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    records: DashMap<String, PerformanceRecord>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combined performance score for the agent; exactly 0.5 for an agent
    /// with no history.
    pub fn score(&self, agent_id: &str) -> f64 {
        self.records
            .get(agent_id)
            .map(|r| r.score())
            .unwrap_or(PerformanceRecord::NEUTRAL)
    }

    pub fn record(&self, agent_id: &str) -> PerformanceRecord {
        self.records
            .get(agent_id)
            .map(|r| *r)
            .unwrap_or_default()
    }

    /// Fold a task outcome into the agent's completion rate.
    pub fn record_outcome(&self, agent_id: &str, success: bool) {
        let observation = if success { 1.0 } else { 0.0 };
        let mut record = self.records.entry(agent_id.to_string()).or_default();
        record.task_completion_rate = Some(ema(record.task_completion_rate, observation));
    }

    pub fn record_quality(&self, agent_id: &str, quality: f64) {
        let mut record = self.records.entry(agent_id.to_string()).or_default();
        record.quality_score = Some(ema(record.quality_score, quality.clamp(0.0, 1.0)));
    }

    pub fn record_cooperation(&self, agent_id: &str, cooperation: f64) {
        let mut record = self.records.entry(agent_id.to_string()).or_default();
        record.cooperation_score = Some(ema(record.cooperation_score, cooperation.clamp(0.0, 1.0)));
    }

    /// Replace an agent's record wholesale. Used for seeding known history.
    pub fn set_record(&self, agent_id: impl Into<String>, record: PerformanceRecord) {
        self.records.insert(agent_id.into(), record);
    }
}
