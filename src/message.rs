//! Typed messages exchanged between agents and the coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receiver sentinel for messages fanned out to every known agent.
pub const BROADCAST: &str = "all";

/// Sender id used for coordinator-originated messages.
pub const COORDINATOR: &str = "coordinator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    TaskAssignment,
    StatusUpdate,
    KnowledgeShare,
    RequestHelp,
    ProvideFeedback,
    SystemAlert,
    GroupCreation,
    ProgressUpdate,
    Coordination,
    Unrecognized,
}

/// Structured payload, tagged by message kind.
///
/// The `Unrecognized` variant keeps the kind set open: messages of a kind
/// this coordinator does not know are still delivered, carrying their raw
/// content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    TaskAssignment {
        task_id: String,
        subtask_id: Option<String>,
        description: String,
    },
    StatusUpdate {
        available: bool,
        progress: f64,
    },
    KnowledgeShare {
        topic: String,
        content: String,
    },
    RequestHelp {
        task_id: String,
        reason: String,
    },
    ProvideFeedback {
        task_id: String,
        score: f64,
        comments: String,
    },
    SystemAlert {
        message: String,
    },
    GroupCreation {
        group_id: String,
        members: Vec<String>,
        thread_id: String,
    },
    ProgressUpdate {
        task_id: String,
        progress: f64,
    },
    Coordination {
        action: String,
        detail: serde_json::Value,
    },
    Unrecognized {
        kind: String,
        content: serde_json::Value,
    },
}

impl MessagePayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::TaskAssignment { .. } => MessageType::TaskAssignment,
            Self::StatusUpdate { .. } => MessageType::StatusUpdate,
            Self::KnowledgeShare { .. } => MessageType::KnowledgeShare,
            Self::RequestHelp { .. } => MessageType::RequestHelp,
            Self::ProvideFeedback { .. } => MessageType::ProvideFeedback,
            Self::SystemAlert { .. } => MessageType::SystemAlert,
            Self::GroupCreation { .. } => MessageType::GroupCreation,
            Self::ProgressUpdate { .. } => MessageType::ProgressUpdate,
            Self::Coordination { .. } => MessageType::Coordination,
            Self::Unrecognized { .. } => MessageType::Unrecognized,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TaskAssignment { .. } => "task_assignment",
            Self::StatusUpdate { .. } => "status_update",
            Self::KnowledgeShare { .. } => "knowledge_share",
            Self::RequestHelp { .. } => "request_help",
            Self::ProvideFeedback { .. } => "provide_feedback",
            Self::SystemAlert { .. } => "system_alert",
            Self::GroupCreation { .. } => "group_creation",
            Self::ProgressUpdate { .. } => "progress_update",
            Self::Coordination { .. } => "coordination",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

fn default_priority() -> i64 {
    1
}

/// A message queued for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub payload: MessagePayload,
    pub timestamp: DateTime<Utc>,

    /// Advisory urgency. Delivery stays FIFO regardless of this value.
    #[serde(default = "default_priority")]
    pub priority: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(default)]
    pub requires_response: bool,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        payload: MessagePayload,
    ) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4()),
            sender: sender.into(),
            receiver: receiver.into(),
            payload,
            timestamp: Utc::now(),
            priority: default_priority(),
            thread_id: None,
            requires_response: false,
        }
    }

    pub fn broadcast(sender: impl Into<String>, payload: MessagePayload) -> Self {
        Self::new(sender, BROADCAST, payload)
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn require_response(mut self) -> Self {
        self.requires_response = true;
        self
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn is_broadcast(&self) -> bool {
        self.receiver == BROADCAST
    }

    pub fn is_for(&self, agent_id: &str) -> bool {
        self.receiver == agent_id || self.is_broadcast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new(
            "agent-1",
            "agent-2",
            MessagePayload::KnowledgeShare {
                topic: "parsing".into(),
                content: "grammar is LL(1)".into(),
            },
        );

        assert!(msg.id.starts_with("msg_"));
        assert_eq!(msg.sender, "agent-1");
        assert_eq!(msg.receiver, "agent-2");
        assert_eq!(msg.priority, 1);
        assert!(!msg.requires_response);
        assert!(!msg.is_broadcast());
        assert!(msg.is_for("agent-2"));
        assert!(!msg.is_for("agent-3"));
    }

    #[test]
    fn test_broadcast_message() {
        let msg = Message::broadcast(
            COORDINATOR,
            MessagePayload::SystemAlert {
                message: "queue draining".into(),
            },
        );

        assert!(msg.is_broadcast());
        assert!(msg.is_for("any-agent"));
        assert_eq!(msg.message_type(), MessageType::SystemAlert);
    }

    #[test]
    fn test_payload_type_names() {
        let cases = vec![
            (
                MessagePayload::TaskAssignment {
                    task_id: "t1".into(),
                    subtask_id: None,
                    description: "d".into(),
                },
                "task_assignment",
            ),
            (
                MessagePayload::ProgressUpdate {
                    task_id: "t1".into(),
                    progress: 0.5,
                },
                "progress_update",
            ),
            (
                MessagePayload::Unrecognized {
                    kind: "future_kind".into(),
                    content: serde_json::json!({"x": 1}),
                },
                "unrecognized",
            ),
        ];

        for (payload, expected) in cases {
            assert_eq!(payload.type_name(), expected);
        }
    }

    #[test]
    fn test_payload_tagged_serialization() {
        let payload = MessagePayload::StatusUpdate {
            available: true,
            progress: 0.25,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "status_update");

        let back: MessagePayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.message_type(), MessageType::StatusUpdate);
    }

    #[test]
    fn test_builder_flags() {
        let msg = Message::new(
            "agent-1",
            "agent-2",
            MessagePayload::RequestHelp {
                task_id: "t1".into(),
                reason: "stuck".into(),
            },
        )
        .with_thread("thread-1")
        .with_priority(5)
        .require_response();

        assert_eq!(msg.thread_id.as_deref(), Some("thread-1"));
        assert_eq!(msg.priority, 5);
        assert!(msg.requires_response);
    }
}
