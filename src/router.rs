//! FIFO message routing with side effects on shared coordination state.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::agent::StatusBoard;
use crate::error::{CoordError, Result};
use crate::groups::ThreadRegistry;
use crate::message::{Message, MessagePayload};
use crate::trackers::PerformanceTracker;

/// Routes messages between agents over a bounded FIFO queue.
///
/// `send` enqueues; `run` (or `deliver_next` in tests) dequeues in arrival
/// order and applies per-kind handling. Handler failures are logged and do
/// not stop delivery of later messages.
pub struct MessageRouter {
    board: Arc<StatusBoard>,
    threads: Arc<ThreadRegistry>,
    performance: Arc<PerformanceTracker>,
    tx: mpsc::Sender<Message>,
    rx: Mutex<mpsc::Receiver<Message>>,
}

impl MessageRouter {
    pub fn new(
        capacity: usize,
        board: Arc<StatusBoard>,
        threads: Arc<ThreadRegistry>,
        performance: Arc<PerformanceTracker>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            board,
            threads,
            performance,
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Validate and enqueue a message. The receiver must be a known agent
    /// or the broadcast sentinel; a thread id, if present, must exist, and
    /// the message is appended to that thread before queueing.
    pub async fn send(&self, message: Message) -> Result<()> {
        if message.sender.is_empty() {
            return Err(CoordError::InvalidMessage("empty sender".into()));
        }
        if message.receiver.is_empty() {
            return Err(CoordError::InvalidMessage("empty receiver".into()));
        }
        if !message.is_broadcast() && !self.board.contains(&message.receiver) {
            return Err(CoordError::InvalidMessage(format!(
                "unknown receiver: {}",
                message.receiver
            )));
        }

        if let Some(thread_id) = &message.thread_id {
            self.threads.append(thread_id, message.clone())?;
        }

        debug!(
            message_id = %message.id,
            sender = %message.sender,
            receiver = %message.receiver,
            kind = message.payload.type_name(),
            "Message queued"
        );
        self.tx
            .send(message)
            .await
            .map_err(|_| CoordError::Queue("message queue closed".into()))
    }

    pub async fn broadcast(&self, sender: impl Into<String>, payload: MessagePayload) -> Result<()> {
        self.send(Message::broadcast(sender, payload)).await
    }

    /// Dequeue and deliver one message. Returns `Ok(None)` when the queue
    /// has been closed and drained.
    pub async fn deliver_next(&self) -> Result<Option<Message>> {
        let message = { self.rx.lock().await.recv().await };
        match message {
            Some(message) => {
                self.deliver(&message);
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    /// Deliver messages until shutdown is signalled, then drain whatever is
    /// already queued before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut rx = self.rx.lock().await;
        loop {
            tokio::select! {
                message = rx.recv() => {
                    match message {
                        Some(message) => self.deliver(&message),
                        None => break,
                    }
                }
                _ = shutdown.wait_for(|stop| *stop) => {
                    while let Ok(message) = rx.try_recv() {
                        self.deliver(&message);
                    }
                    info!("Message router stopped");
                    break;
                }
            }
        }
    }

    fn deliver(&self, message: &Message) {
        if message.is_broadcast() {
            for agent_id in self.board.agent_ids() {
                if agent_id != message.sender {
                    self.board.touch(&agent_id);
                }
            }
        } else {
            self.board.touch(&message.receiver);
        }

        if let Err(error) = self.handle(message) {
            warn!(
                message_id = %message.id,
                kind = message.payload.type_name(),
                %error,
                "Message handling failed"
            );
        }
    }

    fn handle(&self, message: &Message) -> Result<()> {
        match &message.payload {
            MessagePayload::StatusUpdate {
                available,
                progress,
            } => {
                self.board.set_available(&message.sender, *available)?;
                self.board.update_progress(&message.sender, *progress)?;
            }
            MessagePayload::ProgressUpdate { task_id, progress } => {
                // The engine reports task progress under the coordinator id,
                // which has no status entry.
                if self.board.contains(&message.sender) {
                    self.board.update_progress(&message.sender, *progress)?;
                } else {
                    debug!(
                        task_id = %task_id,
                        sender = %message.sender,
                        progress,
                        "Progress update from non-agent sender"
                    );
                }
            }
            MessagePayload::ProvideFeedback { task_id, score, .. } => {
                if !message.is_broadcast() && self.board.contains(&message.receiver) {
                    self.performance
                        .record_cooperation(&message.receiver, score.clamp(0.0, 1.0));
                    debug!(
                        task_id = %task_id,
                        agent_id = %message.receiver,
                        score,
                        "Feedback recorded"
                    );
                }
            }
            MessagePayload::Unrecognized { kind, .. } => {
                debug!(
                    message_id = %message.id,
                    kind = %kind,
                    "Unrecognized message kind delivered as-is"
                );
            }
            _ => {
                debug!(
                    message_id = %message.id,
                    kind = message.payload.type_name(),
                    "Message delivered"
                );
            }
        }
        Ok(())
    }
}
