//! Task execution: planning, dispatch, and result aggregation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::agent::{AgentHandle, StatusBoard};
use crate::allocator::select_agent;
use crate::config::{ParallelFailurePolicy, TeamConfig};
use crate::error::{CoordError, Result};
use crate::groups::GroupRegistry;
use crate::message::{Message, MessagePayload, COORDINATOR};
use crate::router::MessageRouter;
use crate::task::{
    CollaborationMode, ExecutionPlan, FailureReason, Subtask, SubtaskResult, Task, TaskStatus,
};
use crate::trackers::{PerformanceTracker, WorkloadTracker};

/// Snapshot of the team handed to the planner.
#[derive(Debug, Clone)]
pub struct TeamView {
    pub agents: Vec<String>,
    pub mode: CollaborationMode,
}

/// Turns a task into an execution plan.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, task: &Task, team: &TeamView) -> Result<ExecutionPlan>;
}

/// Fallback planner: the whole task becomes one subtask carrying the task's
/// own capability requirements.
pub struct DirectPlanner;

#[async_trait]
impl Planner for DirectPlanner {
    async fn plan(&self, task: &Task, team: &TeamView) -> Result<ExecutionPlan> {
        let subtask = Subtask::new(0, &task.description)
            .with_capabilities(task.required_capabilities.clone());
        Ok(ExecutionPlan::new(team.mode).with_subtask(subtask))
    }
}

/// Aggregated output of one execution attempt.
struct PlanOutcome {
    results: Vec<SubtaskResult>,
    failure: Option<FailureReason>,
}

impl PlanOutcome {
    fn completed(results: Vec<SubtaskResult>) -> Self {
        Self {
            results,
            failure: None,
        }
    }

    fn failed(results: Vec<SubtaskResult>, reason: FailureReason) -> Self {
        Self {
            results,
            failure: Some(reason),
        }
    }
}

/// Drives tasks from submission to a terminal status.
///
/// Tasks are queued at submission and executed under a concurrency cap.
/// Subtask dispatch follows the plan's collaboration mode; results are
/// aggregated in plan order regardless of completion order.
pub struct ExecutionEngine {
    config: TeamConfig,
    board: Arc<StatusBoard>,
    workload: Arc<WorkloadTracker>,
    performance: Arc<PerformanceTracker>,
    router: Arc<MessageRouter>,
    groups: Arc<GroupRegistry>,
    planner: Arc<dyn Planner>,
    handles: RwLock<HashMap<String, Arc<dyn AgentHandle>>>,
    tasks: DashMap<String, Task>,
    queue_tx: mpsc::Sender<String>,
    queue_rx: Mutex<mpsc::Receiver<String>>,
    semaphore: Arc<Semaphore>,
}

impl ExecutionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: TeamConfig,
        board: Arc<StatusBoard>,
        workload: Arc<WorkloadTracker>,
        performance: Arc<PerformanceTracker>,
        router: Arc<MessageRouter>,
        groups: Arc<GroupRegistry>,
        planner: Arc<dyn Planner>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.channel_capacity);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_tasks));
        Self {
            config,
            board,
            workload,
            performance,
            router,
            groups,
            planner,
            handles: RwLock::new(HashMap::new()),
            tasks: DashMap::new(),
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            semaphore,
        }
    }

    pub fn register_agent(&self, handle: Arc<dyn AgentHandle>) {
        let agent_id = handle.id().to_string();
        self.board.register(&agent_id, handle.capabilities());
        self.handles.write().insert(agent_id.clone(), handle);
        info!(agent_id = %agent_id, "Agent registered");
    }

    pub fn remove_agent(&self, agent_id: &str) -> bool {
        self.handles.write().remove(agent_id);
        self.board.remove(agent_id)
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.tasks.get(task_id).map(|t| t.clone())
    }

    /// Plan a task and queue it for execution. A planner error marks the
    /// task failed before it ever queues.
    pub async fn assign_task(&self, mut task: Task) -> Result<String> {
        let task_id = task.id.clone();
        let team = TeamView {
            agents: self.board.agent_ids(),
            mode: self.config.collaboration_mode,
        };

        match self.planner.plan(&task, &team).await {
            Ok(plan) => {
                debug!(
                    task_id = %task_id,
                    subtasks = plan.len(),
                    mode = ?plan.mode,
                    "Task planned"
                );
                task.plan = Some(plan);
                task.status = TaskStatus::Planned;
                self.tasks.insert(task_id.clone(), task);
            }
            Err(error) => {
                warn!(task_id = %task_id, %error, "Planning failed");
                task.status = TaskStatus::Failed;
                task.failure = Some(FailureReason::PlanningFailed);
                self.tasks.insert(task_id.clone(), task);
                return Err(CoordError::Planning(error.to_string()));
            }
        }

        self.queue_tx
            .send(task_id.clone())
            .await
            .map_err(|_| CoordError::Queue("task queue closed".into()))?;
        Ok(task_id)
    }

    /// Execute queued tasks until shutdown is signalled, then drain the
    /// queue. In-flight tasks keep running on their own spawned workers.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut rx = self.queue_rx.lock().await;
        loop {
            tokio::select! {
                task_id = rx.recv() => {
                    match task_id {
                        Some(task_id) => Self::spawn_task(&self, task_id).await,
                        None => break,
                    }
                }
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                    while let Ok(task_id) = rx.try_recv() {
                        Self::spawn_task(&self, task_id).await;
                    }
                    info!("Execution engine stopped");
                    break;
                }
            }
        }
    }

    async fn spawn_task(engine: &Arc<Self>, task_id: String) {
        let permit = match Arc::clone(&engine.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        let engine = Arc::clone(engine);
        tokio::spawn(async move {
            engine.execute_task(&task_id).await;
            drop(permit);
        });
    }

    async fn execute_task(&self, task_id: &str) {
        let (plan, fallback) = {
            let mut entry = match self.tasks.get_mut(task_id) {
                Some(entry) => entry,
                None => {
                    warn!(task_id = %task_id, "Queued task no longer exists");
                    return;
                }
            };
            entry.status = TaskStatus::Executing;
            let plan = match entry.plan.clone() {
                Some(plan) => plan,
                None => {
                    entry.status = TaskStatus::Failed;
                    entry.failure = Some(FailureReason::PlanningFailed);
                    return;
                }
            };
            (plan, entry.required_capabilities.clone())
        };

        if plan.is_empty() {
            self.settle(task_id, &plan, PlanOutcome::completed(Vec::new()))
                .await;
            return;
        }

        let deadline = Duration::from_secs(self.config.task_timeout_secs);
        let attempt = match plan.mode {
            CollaborationMode::Parallel => {
                tokio::time::timeout(deadline, self.execute_parallel(task_id, &plan, &fallback))
                    .await
            }
            CollaborationMode::Sequential => {
                tokio::time::timeout(deadline, self.execute_sequential(task_id, &plan, &fallback))
                    .await
            }
        };

        let outcome = match attempt {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    task_id = %task_id,
                    seconds = self.config.task_timeout_secs,
                    "Task timed out"
                );
                PlanOutcome::failed(Vec::new(), FailureReason::Timeout)
            }
        };
        self.settle(task_id, &plan, outcome).await;
    }

    /// Resolve every subtask to an agent up front, then dispatch all of them
    /// concurrently. `join_all` keeps results in plan order no matter which
    /// agent finishes first.
    async fn execute_parallel(
        &self,
        task_id: &str,
        plan: &ExecutionPlan,
        fallback: &HashSet<String>,
    ) -> PlanOutcome {
        let statuses = self.board.snapshot();
        let mut working = self.workload.loads();

        let mut assignments: Vec<(&Subtask, String)> = Vec::with_capacity(plan.len());
        for subtask in &plan.subtasks {
            match self.resolve_agent(subtask, fallback, &statuses, &working) {
                Some(agent_id) => {
                    *working.entry(agent_id.clone()).or_insert(0.0) += 1.0;
                    assignments.push((subtask, agent_id));
                }
                None => {
                    warn!(
                        task_id = %task_id,
                        subtask_id = %subtask.id,
                        "No eligible agent for subtask"
                    );
                    return PlanOutcome::failed(Vec::new(), FailureReason::NoCandidate);
                }
            }
        }

        for (subtask, agent_id) in &assignments {
            self.workload.assign(&subtask.id, agent_id, 1.0);
            self.notify_assignment(task_id, subtask, agent_id).await;
        }

        let mut distinct: Vec<String> = assignments
            .iter()
            .map(|(_, agent_id)| agent_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        distinct.sort();
        if distinct.len() >= 2 {
            if let Err(error) = self.groups.create_group(task_id, distinct).await {
                warn!(task_id = %task_id, %error, "Group creation failed");
            }
        }

        let results = join_all(
            assignments
                .iter()
                .map(|(subtask, agent_id)| self.dispatch(subtask, agent_id)),
        )
        .await;

        let any_failed = results.iter().any(|r| !r.success);
        if any_failed && self.config.parallel_failure_policy == ParallelFailurePolicy::FailTask {
            PlanOutcome::failed(results, FailureReason::SubtaskFailed)
        } else {
            PlanOutcome::completed(results)
        }
    }

    /// Dispatch subtasks one at a time in index order, re-selecting against
    /// fresh snapshots each step. The first failure stops the chain;
    /// earlier results are retained.
    async fn execute_sequential(
        &self,
        task_id: &str,
        plan: &ExecutionPlan,
        fallback: &HashSet<String>,
    ) -> PlanOutcome {
        let mut ordered: Vec<&Subtask> = plan.subtasks.iter().collect();
        ordered.sort_by_key(|subtask| subtask.index);

        let mut results = Vec::with_capacity(ordered.len());
        for subtask in ordered {
            let statuses = self.board.snapshot();
            let working = self.workload.loads();
            let agent_id = match self.resolve_agent(subtask, fallback, &statuses, &working) {
                Some(agent_id) => agent_id,
                None => {
                    warn!(
                        task_id = %task_id,
                        subtask_id = %subtask.id,
                        "No eligible agent for subtask"
                    );
                    return PlanOutcome::failed(results, FailureReason::NoCandidate);
                }
            };

            self.workload.assign(&subtask.id, &agent_id, 1.0);
            self.notify_assignment(task_id, subtask, &agent_id).await;

            let result = self.dispatch(subtask, &agent_id).await;
            self.workload.complete(&subtask.id);
            let failed = !result.success;
            results.push(result);
            if failed {
                return PlanOutcome::failed(results, FailureReason::SubtaskFailed);
            }
        }
        PlanOutcome::completed(results)
    }

    /// Honor a planner pre-binding only while that agent is known and
    /// available; otherwise score the pool. A subtask with no capability
    /// requirements of its own inherits the task's.
    fn resolve_agent(
        &self,
        subtask: &Subtask,
        fallback: &HashSet<String>,
        statuses: &HashMap<String, crate::agent::AgentStatus>,
        working: &HashMap<String, f64>,
    ) -> Option<String> {
        if let Some(bound) = &subtask.assigned_agent {
            if statuses.get(bound).map(|s| s.available).unwrap_or(false) {
                return Some(bound.clone());
            }
        }

        let required = if subtask.required_capabilities.is_empty() {
            fallback
        } else {
            &subtask.required_capabilities
        };
        select_agent(required, statuses, working, &self.performance)
            .map(|allocation| allocation.agent_id)
    }

    async fn notify_assignment(&self, task_id: &str, subtask: &Subtask, agent_id: &str) {
        let message = Message::new(
            COORDINATOR,
            agent_id,
            MessagePayload::TaskAssignment {
                task_id: task_id.to_string(),
                subtask_id: Some(subtask.id.clone()),
                description: subtask.description.clone(),
            },
        );
        if let Err(error) = self.router.send(message).await {
            warn!(
                task_id = %task_id,
                agent_id = %agent_id,
                %error,
                "Assignment notification failed"
            );
        }
    }

    async fn dispatch(&self, subtask: &Subtask, agent_id: &str) -> SubtaskResult {
        let handle = { self.handles.read().get(agent_id).cloned() };
        let handle = match handle {
            Some(handle) => handle,
            None => {
                return SubtaskResult::failure(&subtask.id, agent_id, "agent handle not registered")
            }
        };

        match handle.process(subtask).await {
            Ok(result) => result,
            Err(error) => SubtaskResult::failure(&subtask.id, agent_id, error.to_string()),
        }
    }

    /// Record the terminal outcome: fold results into performance history,
    /// retract every workload assignment the plan created, store the task's
    /// final state, and tear down its groups.
    async fn settle(&self, task_id: &str, plan: &ExecutionPlan, outcome: PlanOutcome) {
        for result in &outcome.results {
            self.performance.record_outcome(&result.agent_id, result.success);
        }
        for subtask in &plan.subtasks {
            self.workload.complete(&subtask.id);
        }

        let completed = outcome.failure.is_none();
        if let Some(mut entry) = self.tasks.get_mut(task_id) {
            entry.results = outcome.results;
            if completed {
                entry.status = TaskStatus::Completed;
                entry.failure = None;
                info!(task_id = %task_id, results = entry.results.len(), "Task completed");
            } else {
                entry.status = TaskStatus::Failed;
                entry.failure = outcome.failure;
                warn!(
                    task_id = %task_id,
                    reason = %outcome.failure.unwrap_or(FailureReason::SubtaskFailed),
                    "Task failed"
                );
            }
        }

        self.groups.remove_for_task(task_id);

        let progress = if completed { 1.0 } else { 0.0 };
        let update = Message::broadcast(
            COORDINATOR,
            MessagePayload::ProgressUpdate {
                task_id: task_id.to_string(),
                progress,
            },
        );
        if let Err(error) = self.router.send(update).await {
            debug!(task_id = %task_id, %error, "Progress broadcast failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::ThreadRegistry;
    use crate::task::CollaborationMode;

    struct ScriptedAgent {
        id: String,
        capabilities: HashSet<String>,
        fail_on: HashSet<usize>,
        delay: Duration,
    }

    impl ScriptedAgent {
        fn new(id: &str, capabilities: &[&str]) -> Self {
            Self {
                id: id.to_string(),
                capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
                fail_on: HashSet::new(),
                delay: Duration::ZERO,
            }
        }

        fn failing_on(mut self, index: usize) -> Self {
            self.fail_on.insert(index);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl AgentHandle for ScriptedAgent {
        fn id(&self) -> &str {
            &self.id
        }

        fn capabilities(&self) -> HashSet<String> {
            self.capabilities.clone()
        }

        async fn process(&self, subtask: &Subtask) -> Result<SubtaskResult> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_on.contains(&subtask.index) {
                return Ok(SubtaskResult::failure(
                    &subtask.id,
                    &self.id,
                    "scripted failure",
                ));
            }
            Ok(SubtaskResult::success(
                &subtask.id,
                &self.id,
                format!("done: {}", subtask.description),
            ))
        }
    }

    struct FixedPlanner {
        plan: ExecutionPlan,
    }

    #[async_trait]
    impl Planner for FixedPlanner {
        async fn plan(&self, _task: &Task, _team: &TeamView) -> Result<ExecutionPlan> {
            Ok(self.plan.clone())
        }
    }

    fn engine_with(config: TeamConfig, planner: Arc<dyn Planner>) -> Arc<ExecutionEngine> {
        let board = Arc::new(StatusBoard::new());
        let threads = Arc::new(ThreadRegistry::new());
        let performance = Arc::new(PerformanceTracker::new());
        let workload = Arc::new(WorkloadTracker::new());
        let router = Arc::new(MessageRouter::new(
            config.channel_capacity,
            Arc::clone(&board),
            Arc::clone(&threads),
            Arc::clone(&performance),
        ));
        let groups = Arc::new(GroupRegistry::new(
            Arc::clone(&board),
            threads,
            Arc::clone(&router),
        ));
        Arc::new(ExecutionEngine::new(
            config,
            board,
            workload,
            performance,
            router,
            groups,
            planner,
        ))
    }

    fn parallel_plan(count: usize) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new(CollaborationMode::Parallel);
        for i in 0..count {
            plan = plan.with_subtask(Subtask::new(i, format!("part {i}")));
        }
        plan
    }

    #[tokio::test]
    async fn test_direct_planner_single_subtask() {
        let engine = engine_with(TeamConfig::default(), Arc::new(DirectPlanner));
        engine.register_agent(Arc::new(ScriptedAgent::new("w1", &["build"])));

        let task = Task::new("compile the project").with_capability("build");
        let task_id = engine.assign_task(task).await.unwrap();

        let stored = engine.task(&task_id).unwrap();
        assert_eq!(stored.status, TaskStatus::Planned);
        let plan = stored.plan.unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.subtasks[0].required_capabilities.contains("build"));
    }

    #[tokio::test]
    async fn test_parallel_results_in_plan_order() {
        let planner = FixedPlanner {
            plan: parallel_plan(3),
        };
        let engine = engine_with(TeamConfig::default(), Arc::new(planner));
        engine.register_agent(Arc::new(ScriptedAgent::new("w1", &[])));

        let task_id = engine.assign_task(Task::new("fan out")).await.unwrap();
        engine.execute_task(&task_id).await;

        let task = engine.task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.results.len(), 3);
        for (i, result) in task.results.iter().enumerate() {
            assert!(result.success);
            assert_eq!(result.output, format!("done: part {i}"));
        }
    }

    #[tokio::test]
    async fn test_parallel_failure_retains_sibling_results() {
        let planner = FixedPlanner {
            plan: parallel_plan(3),
        };
        let engine = engine_with(TeamConfig::default(), Arc::new(planner));
        engine.register_agent(Arc::new(ScriptedAgent::new("w1", &[]).failing_on(1)));

        let task_id = engine.assign_task(Task::new("fan out")).await.unwrap();
        engine.execute_task(&task_id).await;

        let task = engine.task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.failure, Some(FailureReason::SubtaskFailed));
        assert_eq!(task.results.len(), 3);
        assert!(task.results[0].success);
        assert!(!task.results[1].success);
        assert!(task.results[2].success);
    }

    #[tokio::test]
    async fn test_parallel_tolerate_policy_completes() {
        let planner = FixedPlanner {
            plan: parallel_plan(2),
        };
        let config =
            TeamConfig::default().with_parallel_failure_policy(ParallelFailurePolicy::Tolerate);
        let engine = engine_with(config, Arc::new(planner));
        engine.register_agent(Arc::new(ScriptedAgent::new("w1", &[]).failing_on(0)));

        let task_id = engine.assign_task(Task::new("fan out")).await.unwrap();
        engine.execute_task(&task_id).await;

        let task = engine.task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(!task.results[0].success);
        assert!(task.results[1].success);
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let mut plan = ExecutionPlan::new(CollaborationMode::Sequential);
        for i in 0..3 {
            plan = plan.with_subtask(Subtask::new(i, format!("step {i}")));
        }
        let engine = engine_with(TeamConfig::default(), Arc::new(FixedPlanner { plan }));
        engine.register_agent(Arc::new(ScriptedAgent::new("w1", &[]).failing_on(1)));

        let task_id = engine.assign_task(Task::new("pipeline")).await.unwrap();
        engine.execute_task(&task_id).await;

        let task = engine.task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.failure, Some(FailureReason::SubtaskFailed));
        // Step 2 never ran.
        assert_eq!(task.results.len(), 2);
        assert!(task.results[0].success);
        assert!(!task.results[1].success);
    }

    #[tokio::test]
    async fn test_no_candidate_fails_task() {
        let engine = engine_with(TeamConfig::default(), Arc::new(DirectPlanner));
        engine.register_agent(Arc::new(ScriptedAgent::new("w1", &["write"])));

        let task = Task::new("needs review").with_capability("review");
        let task_id = engine.assign_task(task).await.unwrap();
        engine.execute_task(&task_id).await;

        let stored = engine.task(&task_id).unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(stored.failure, Some(FailureReason::NoCandidate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_task_and_clears_workload() {
        let config = TeamConfig::default().with_task_timeout_secs(1);
        let engine = engine_with(config, Arc::new(DirectPlanner));
        engine.register_agent(Arc::new(
            ScriptedAgent::new("w1", &[]).with_delay(Duration::from_secs(5)),
        ));

        let task_id = engine.assign_task(Task::new("slow")).await.unwrap();
        engine.execute_task(&task_id).await;

        let task = engine.task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.failure, Some(FailureReason::Timeout));
        // The abandoned subtask no longer counts toward the agent's load.
        assert_eq!(engine.workload.current_load("w1"), 0.0);
    }

    #[tokio::test]
    async fn test_planner_error_marks_task_failed() {
        struct BrokenPlanner;

        #[async_trait]
        impl Planner for BrokenPlanner {
            async fn plan(&self, _task: &Task, _team: &TeamView) -> Result<ExecutionPlan> {
                Err(CoordError::Planning("no decomposition".into()))
            }
        }

        let engine = engine_with(TeamConfig::default(), Arc::new(BrokenPlanner));
        let task = Task::new("unplannable");
        let task_id = task.id.clone();

        let err = engine.assign_task(task).await.unwrap_err();
        assert!(matches!(err, CoordError::Planning(_)));

        let stored = engine.task(&task_id).unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(stored.failure, Some(FailureReason::PlanningFailed));
    }

    #[tokio::test]
    async fn test_multi_agent_plan_creates_group() {
        let plan = ExecutionPlan::new(CollaborationMode::Parallel)
            .with_subtask(Subtask::new(0, "a").bound_to("w1"))
            .with_subtask(Subtask::new(1, "b").bound_to("w2"));
        let engine = engine_with(TeamConfig::default(), Arc::new(FixedPlanner { plan }));
        engine.register_agent(Arc::new(ScriptedAgent::new("w1", &[])));
        engine.register_agent(Arc::new(ScriptedAgent::new("w2", &[])));

        let task_id = engine.assign_task(Task::new("pair work")).await.unwrap();
        engine.execute_task(&task_id).await;

        let task = engine.task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.results[0].agent_id, "w1");
        assert_eq!(task.results[1].agent_id, "w2");
        // Groups are torn down once the task settles.
        assert_eq!(engine.groups.group_count(), 0);
    }

    #[tokio::test]
    async fn test_agent_error_becomes_failed_result() {
        struct ErroringAgent;

        #[async_trait]
        impl AgentHandle for ErroringAgent {
            fn id(&self) -> &str {
                "w1"
            }

            fn capabilities(&self) -> HashSet<String> {
                HashSet::new()
            }

            async fn process(&self, subtask: &Subtask) -> Result<SubtaskResult> {
                Err(CoordError::SubtaskExecution {
                    subtask_id: subtask.id.clone(),
                    reason: "runtime crashed".into(),
                })
            }
        }

        let engine = engine_with(TeamConfig::default(), Arc::new(DirectPlanner));
        engine.register_agent(Arc::new(ErroringAgent));

        let task_id = engine.assign_task(Task::new("doomed")).await.unwrap();
        engine.execute_task(&task_id).await;

        let task = engine.task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.results.len(), 1);
        assert!(!task.results[0].success);
        assert!(task.results[0].output.contains("runtime crashed"));
    }

    #[tokio::test]
    async fn test_outcomes_feed_performance_history() {
        let engine = engine_with(TeamConfig::default(), Arc::new(DirectPlanner));
        engine.register_agent(Arc::new(ScriptedAgent::new("w1", &[])));

        let task_id = engine.assign_task(Task::new("quick win")).await.unwrap();
        engine.execute_task(&task_id).await;

        assert!(engine.performance.score("w1") > 0.5);
    }

    #[tokio::test]
    async fn test_empty_plan_completes_immediately() {
        let plan = ExecutionPlan::new(CollaborationMode::Parallel);
        let engine = engine_with(TeamConfig::default(), Arc::new(FixedPlanner { plan }));

        let task_id = engine.assign_task(Task::new("noop")).await.unwrap();
        engine.execute_task(&task_id).await;

        let task = engine.task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.results.is_empty());
    }
}
