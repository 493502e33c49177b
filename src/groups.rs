//! Message threads and task groups.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::agent::StatusBoard;
use crate::error::{CoordError, Result};
use crate::message::{Message, MessagePayload, COORDINATOR};
use crate::router::MessageRouter;

/// Agents collaborating on one task, backed by a shared message thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGroup {
    pub group_id: String,
    pub task_id: String,
    pub members: Vec<String>,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only message histories keyed by thread id.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: DashMap<String, Vec<Message>>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh thread id, unique for the process lifetime.
    pub fn create_thread(&self) -> String {
        let thread_id = format!("thread_{}", Uuid::new_v4());
        self.threads.insert(thread_id.clone(), Vec::new());
        debug!(thread_id = %thread_id, "Thread created");
        thread_id
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.threads.contains_key(thread_id)
    }

    /// Append a message to a thread's history. Insertion order is delivery
    /// order; entries are never reordered or removed.
    pub fn append(&self, thread_id: &str, message: Message) -> Result<()> {
        let mut history = self
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| CoordError::UnknownThread(thread_id.to_string()))?;
        history.push(message);
        Ok(())
    }

    pub fn history(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.threads
            .get(thread_id)
            .map(|history| history.clone())
            .ok_or_else(|| CoordError::UnknownThread(thread_id.to_string()))
    }
}

/// Registry of task groups. Creating a group allocates its backing thread
/// and notifies every member through the router.
pub struct GroupRegistry {
    groups: DashMap<String, TaskGroup>,
    board: Arc<StatusBoard>,
    threads: Arc<ThreadRegistry>,
    router: Arc<MessageRouter>,
}

impl GroupRegistry {
    pub fn new(
        board: Arc<StatusBoard>,
        threads: Arc<ThreadRegistry>,
        router: Arc<MessageRouter>,
    ) -> Self {
        Self {
            groups: DashMap::new(),
            board,
            threads,
            router,
        }
    }

    /// Register a group for a task and emit one `group_creation` message per
    /// member, each carrying the full member list and the shared thread id.
    pub async fn create_group(&self, task_id: &str, members: Vec<String>) -> Result<String> {
        for member in &members {
            if !self.board.contains(member) {
                return Err(CoordError::UnknownAgent(member.clone()));
            }
        }

        let thread_id = self.threads.create_thread();
        let group_id = format!("group_{}", Uuid::new_v4());

        self.groups.insert(
            group_id.clone(),
            TaskGroup {
                group_id: group_id.clone(),
                task_id: task_id.to_string(),
                members: members.clone(),
                thread_id: thread_id.clone(),
                created_at: Utc::now(),
            },
        );

        for member in &members {
            let notice = Message::new(
                COORDINATOR,
                member,
                MessagePayload::GroupCreation {
                    group_id: group_id.clone(),
                    members: members.clone(),
                    thread_id: thread_id.clone(),
                },
            )
            .with_thread(&thread_id);
            self.router.send(notice).await?;
        }

        info!(
            group_id = %group_id,
            task_id = %task_id,
            thread_id = %thread_id,
            members = members.len(),
            "Task group created"
        );
        Ok(group_id)
    }

    pub fn group(&self, group_id: &str) -> Result<TaskGroup> {
        self.groups
            .get(group_id)
            .map(|group| group.clone())
            .ok_or_else(|| CoordError::UnknownGroup(group_id.to_string()))
    }

    pub fn thread_history(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.threads.history(thread_id)
    }

    /// Arithmetic mean of the members' current progress. A group with no
    /// members reports 0.0 rather than dividing by zero.
    pub fn monitor_progress(&self, group_id: &str) -> Result<f64> {
        let group = self.group(group_id)?;
        if group.members.is_empty() {
            return Ok(0.0);
        }

        let total: f64 = group
            .members
            .iter()
            .map(|member| self.board.get(member).map(|s| s.progress).unwrap_or(0.0))
            .sum();
        Ok(total / group.members.len() as f64)
    }

    pub fn remove_group(&self, group_id: &str) -> bool {
        self.groups.remove(group_id).is_some()
    }

    /// Tear down every group backing the given task. Called when the task
    /// reaches a terminal status.
    pub fn remove_for_task(&self, task_id: &str) {
        self.groups.retain(|_, group| group.task_id != task_id);
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
