//! The chat room hub.
//!
//! All membership and history changes go through one coordinating task.
//! Connection handlers talk to it by sending [`HubCommand`]s through a
//! [`ChatHub`] handle; the only thing they touch directly is a read-locked
//! copy of the history.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::types::{ChatConfig, ChatMessage, MAX_HISTORY_CAPACITY};

/// Queue depth for commands waiting on the coordinating task.
const COMMAND_QUEUE_SIZE: usize = 256;

/// Identifies one registered connection.
pub type ConnectionId = u64;

/// The coordinating task has stopped.
#[derive(Debug, Error)]
#[error("chat hub is not running")]
pub struct HubClosed;

/// Result of joining the room.
#[derive(Debug)]
pub struct Registration {
    pub id: ConnectionId,
    /// History as it stood when the member was added. Every later message
    /// arrives on `receiver`.
    pub history: Vec<ChatMessage>,
    pub receiver: mpsc::Receiver<ChatMessage>,
}

enum HubCommand {
    Register(oneshot::Sender<Registration>),
    Unregister(ConnectionId),
    Broadcast(ChatMessage),
    MemberCount(oneshot::Sender<usize>),
}

type SharedHistory = Arc<RwLock<VecDeque<ChatMessage>>>;

/// Handle to the chat room. Cheap to clone.
#[derive(Clone)]
pub struct ChatHub {
    commands: mpsc::Sender<HubCommand>,
    history: SharedHistory,
}

impl ChatHub {
    /// Create the hub and spawn its coordinating task. The task runs until
    /// the last handle is dropped.
    pub fn new(config: &ChatConfig) -> Self {
        let capacity = config.history_capacity.min(MAX_HISTORY_CAPACITY);
        if capacity < config.history_capacity {
            warn!(
                requested = config.history_capacity,
                capacity, "chat history capacity capped"
            );
        }

        let (commands, rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let history: SharedHistory = Arc::new(RwLock::new(VecDeque::with_capacity(capacity)));

        let state = HubState {
            members: HashMap::new(),
            history: history.clone(),
            capacity,
            connection_buffer: config.connection_buffer.max(1),
            next_id: 1,
            last_timestamp: None,
        };
        tokio::spawn(state.run(rx));

        Self { commands, history }
    }

    /// Join the room.
    pub async fn register(&self) -> Result<Registration, HubClosed> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(HubCommand::Register(tx))
            .await
            .map_err(|_| HubClosed)?;
        rx.await.map_err(|_| HubClosed)
    }

    /// Leave the room. Unknown ids are ignored.
    pub async fn unregister(&self, id: ConnectionId) {
        let _ = self.commands.send(HubCommand::Unregister(id)).await;
    }

    /// Append `message` to history and deliver it to every member.
    pub async fn broadcast(&self, message: ChatMessage) -> Result<(), HubClosed> {
        self.commands
            .send(HubCommand::Broadcast(message))
            .await
            .map_err(|_| HubClosed)
    }

    /// Number of current members. Also waits until every command submitted
    /// before it has been applied.
    pub async fn member_count(&self) -> Result<usize, HubClosed> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(HubCommand::MemberCount(tx))
            .await
            .map_err(|_| HubClosed)?;
        rx.await.map_err(|_| HubClosed)
    }

    /// Snapshot of the history, oldest first.
    pub fn history(&self) -> Vec<ChatMessage> {
        let history = self.history.read().unwrap_or_else(|e| e.into_inner());
        history.iter().cloned().collect()
    }
}

/// State owned by the coordinating task.
struct HubState {
    members: HashMap<ConnectionId, mpsc::Sender<ChatMessage>>,
    history: SharedHistory,
    capacity: usize,
    connection_buffer: usize,
    next_id: ConnectionId,
    last_timestamp: Option<DateTime<Utc>>,
}

impl HubState {
    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        debug!("chat hub started");
        while let Some(command) = rx.recv().await {
            match command {
                HubCommand::Register(reply) => self.register(reply),
                HubCommand::Unregister(id) => self.unregister(id),
                HubCommand::Broadcast(message) => self.broadcast(message),
                HubCommand::MemberCount(reply) => {
                    let _ = reply.send(self.members.len());
                }
            }
        }
        debug!("chat hub stopped");
    }

    fn register(&mut self, reply: oneshot::Sender<Registration>) {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, receiver) = mpsc::channel(self.connection_buffer);
        let history = {
            let history = self.history.read().unwrap_or_else(|e| e.into_inner());
            history.iter().cloned().collect()
        };

        let registration = Registration {
            id,
            history,
            receiver,
        };
        // The caller may have given up waiting; then there is nothing to add.
        if reply.send(registration).is_ok() {
            self.members.insert(id, tx);
            info!(connection = id, members = self.members.len(), "chat member joined");
        }
    }

    fn unregister(&mut self, id: ConnectionId) {
        // Dropping the sender ends the member's writer task.
        if self.members.remove(&id).is_some() {
            info!(connection = id, members = self.members.len(), "chat member left");
        }
    }

    fn broadcast(&mut self, mut message: ChatMessage) {
        if let Some(last) = self.last_timestamp {
            message.timestamp = message.timestamp.max(last);
        }
        self.last_timestamp = Some(message.timestamp);

        {
            let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
            history.push_back(message.clone());
            while history.len() > self.capacity {
                history.pop_front();
            }
        }

        self.members.retain(|id, tx| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(connection = id, "chat member is not keeping up, dropping");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(connection = id, "chat member gone, dropping");
                false
            }
        });
    }
}
