//! Top-level team coordinator wiring the router, engine, and registries.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::agent::{AgentHandle, StatusBoard};
use crate::allocator::{select_agent, Allocation};
use crate::config::TeamConfig;
use crate::engine::{DirectPlanner, ExecutionEngine, Planner};
use crate::error::{CoordError, Result};
use crate::groups::{GroupRegistry, ThreadRegistry};
use crate::message::{Message, MessagePayload};
use crate::router::MessageRouter;
use crate::task::{Task, TaskStatus};
use crate::trackers::{PerformanceTracker, WorkloadTracker};

/// One coordinated team: agents, messaging, and task execution behind a
/// single handle.
///
/// Construct, register agents, then drive `run` on a background task while
/// submitting work through `assign_task`. `shutdown` stops the router and
/// engine loops after they drain their queues.
pub struct TeamCoordinator {
    board: Arc<StatusBoard>,
    workload: Arc<WorkloadTracker>,
    performance: Arc<PerformanceTracker>,
    router: Arc<MessageRouter>,
    groups: Arc<GroupRegistry>,
    engine: Arc<ExecutionEngine>,
    shutdown: watch::Sender<bool>,
}

impl TeamCoordinator {
    pub fn new(config: TeamConfig) -> Self {
        Self::with_planner(config, Arc::new(DirectPlanner))
    }

    pub fn with_planner(config: TeamConfig, planner: Arc<dyn Planner>) -> Self {
        let board = Arc::new(StatusBoard::new());
        let threads = Arc::new(ThreadRegistry::new());
        let workload = Arc::new(WorkloadTracker::new());
        let performance = Arc::new(PerformanceTracker::new());
        let router = Arc::new(MessageRouter::new(
            config.channel_capacity,
            Arc::clone(&board),
            Arc::clone(&threads),
            Arc::clone(&performance),
        ));
        let groups = Arc::new(GroupRegistry::new(
            Arc::clone(&board),
            Arc::clone(&threads),
            Arc::clone(&router),
        ));
        let engine = Arc::new(ExecutionEngine::new(
            config.clone(),
            Arc::clone(&board),
            Arc::clone(&workload),
            Arc::clone(&performance),
            Arc::clone(&router),
            Arc::clone(&groups),
            planner,
        ));
        let (shutdown, _) = watch::channel(false);

        info!(team = %config.name, "Team coordinator initialized");
        Self {
            board,
            workload,
            performance,
            router,
            groups,
            engine,
            shutdown,
        }
    }

    /// Drive message delivery and task execution until shutdown. Both loops
    /// drain their queues before returning.
    pub async fn run(&self) {
        let router_shutdown = self.shutdown.subscribe();
        let engine_shutdown = self.shutdown.subscribe();
        tokio::join!(
            self.router.run(router_shutdown),
            Arc::clone(&self.engine).run(engine_shutdown),
        );
    }

    /// Signal both loops to stop. Takes effect even before `run` is polled,
    /// so a late `run` call exits after draining.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn register_agent(&self, handle: Arc<dyn AgentHandle>) {
        self.engine.register_agent(handle);
    }

    pub fn remove_agent(&self, agent_id: &str) -> bool {
        self.engine.remove_agent(agent_id)
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.board.agent_ids()
    }

    pub async fn assign_task(&self, task: Task) -> Result<String> {
        if *self.shutdown.borrow() {
            return Err(CoordError::Shutdown);
        }
        self.engine.assign_task(task).await
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.engine.task(task_id)
    }

    pub fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        self.engine
            .task(task_id)
            .map(|task| task.status)
            .ok_or_else(|| CoordError::UnknownTask(task_id.to_string()))
    }

    /// Score the current pool for a task without assigning anything.
    pub fn best_agent_for(&self, task: &Task) -> Result<Allocation> {
        select_agent(
            &task.required_capabilities,
            &self.board.snapshot(),
            &self.workload.loads(),
            &self.performance,
        )
        .ok_or_else(|| CoordError::NoCandidate(task.id.clone()))
    }

    pub async fn send(&self, message: Message) -> Result<()> {
        self.router.send(message).await
    }

    pub async fn broadcast(&self, sender: impl Into<String>, payload: MessagePayload) -> Result<()> {
        self.router.broadcast(sender, payload).await
    }

    pub async fn create_group(&self, task_id: &str, members: Vec<String>) -> Result<String> {
        self.groups.create_group(task_id, members).await
    }

    pub fn group(&self, group_id: &str) -> Result<crate::groups::TaskGroup> {
        self.groups.group(group_id)
    }

    pub fn monitor_progress(&self, group_id: &str) -> Result<f64> {
        self.groups.monitor_progress(group_id)
    }

    pub fn thread_history(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.groups.thread_history(thread_id)
    }

    pub fn current_load(&self, agent_id: &str) -> f64 {
        self.workload.current_load(agent_id)
    }

    pub fn performance_score(&self, agent_id: &str) -> f64 {
        self.performance.score(agent_id)
    }
}
