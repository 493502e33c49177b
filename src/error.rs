//! Error types for the coordination core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordError {
    #[error("No eligible agent for task: {0}")]
    NoCandidate(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Unknown thread: {0}")]
    UnknownThread(String),

    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Subtask {subtask_id} failed: {reason}")]
    SubtaskExecution { subtask_id: String, reason: String },

    #[error("Task {task_id} timed out after {seconds}s")]
    Timeout { task_id: String, seconds: u64 },

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Coordinator is shut down")]
    Shutdown,

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoordError::NoCandidate("task-1".into());
        assert_eq!(err.to_string(), "No eligible agent for task: task-1");

        let err = CoordError::Timeout {
            task_id: "task-2".into(),
            seconds: 30,
        };
        assert_eq!(err.to_string(), "Task task-2 timed out after 30s");

        let err = CoordError::SubtaskExecution {
            subtask_id: "sub-1".into(),
            reason: "agent crashed".into(),
        };
        assert!(err.to_string().contains("sub-1"));
        assert!(err.to_string().contains("agent crashed"));
    }
}
