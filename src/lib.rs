//! Coordination core for a team of cooperating agents.
//!
//! A [`TeamCoordinator`] owns three cooperating layers:
//!
//! - an allocation scorer that matches work to agents by capability,
//!   current workload, and historical performance,
//! - a message router that delivers typed messages in FIFO order and
//!   groups them into threads,
//! - an execution engine that plans tasks into subtasks, dispatches them
//!   in parallel or sequentially, and aggregates the results.
//!
//! Agents plug in through the [`AgentHandle`] trait; everything else is
//! in-process state shared behind `Arc`.

pub mod agent;
pub mod allocator;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod groups;
pub mod message;
pub mod router;
pub mod task;
pub mod trackers;

pub use agent::{AgentHandle, AgentStatus, StatusBoard};
pub use allocator::{allocate_all, select_agent, Allocation, AllocationRequest, ScoreBreakdown};
pub use config::{ParallelFailurePolicy, TeamConfig};
pub use coordinator::TeamCoordinator;
pub use engine::{DirectPlanner, ExecutionEngine, Planner, TeamView};
pub use error::{CoordError, Result};
pub use groups::{GroupRegistry, TaskGroup, ThreadRegistry};
pub use message::{Message, MessagePayload, MessageType, BROADCAST, COORDINATOR};
pub use router::MessageRouter;
pub use task::{
    CollaborationMode, ExecutionPlan, FailureReason, Subtask, SubtaskResult, Task, TaskStatus,
};
pub use trackers::{PerformanceRecord, PerformanceTracker, WorkloadTracker};
