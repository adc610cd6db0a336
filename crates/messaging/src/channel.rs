//! Command channel trait and in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::SagaId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commands::Command;
use crate::error::ChannelError;

/// Unique identifier assigned to every sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A command in flight: payload plus the headers the reply must echo back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub message_id: MessageId,
    pub destination: String,
    pub reply_to: String,
    pub saga_id: SagaId,
    pub command: Command,
}

/// Reliable at-least-once command transport.
///
/// The production implementation sits on an outbox plus a broker; delivery
/// retries and ordering per destination are its responsibility. Replies are
/// delivered out of band on the `reply_to` channel, tagged with the saga ID
/// carried here.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Sends a command to a destination channel and returns its message ID.
    async fn send(
        &self,
        destination: &str,
        command: Command,
        reply_to: &str,
        saga_id: SagaId,
    ) -> Result<MessageId, ChannelError>;
}

#[derive(Debug, Default)]
struct InMemoryChannelState {
    queues: HashMap<String, VecDeque<CommandMessage>>,
    sent_total: usize,
    fail_on_send: bool,
}

/// In-memory command channel for tests and single-process wiring.
///
/// Messages are queued per destination and drained by whoever plays the
/// participant role.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCommandChannel {
    state: Arc<RwLock<InMemoryChannelState>>,
}

impl InMemoryCommandChannel {
    /// Creates a new in-memory command channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the channel to fail every send with a transport error.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Removes and returns all queued messages for a destination.
    pub fn drain(&self, destination: &str) -> Vec<CommandMessage> {
        let mut state = self.state.write().unwrap();
        state
            .queues
            .get_mut(destination)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Returns the number of messages currently queued for a destination.
    pub fn queued_count(&self, destination: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .queues
            .get(destination)
            .map_or(0, VecDeque::len)
    }

    /// Returns the total number of messages ever sent through this channel.
    pub fn sent_total(&self) -> usize {
        self.state.read().unwrap().sent_total
    }
}

#[async_trait]
impl CommandChannel for InMemoryCommandChannel {
    async fn send(
        &self,
        destination: &str,
        command: Command,
        reply_to: &str,
        saga_id: SagaId,
    ) -> Result<MessageId, ChannelError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(ChannelError::DestinationUnavailable(
                destination.to_string(),
            ));
        }

        let message = CommandMessage {
            message_id: MessageId::new(),
            destination: destination.to_string(),
            reply_to: reply_to.to_string(),
            saga_id,
            command,
        };
        let message_id = message.message_id;

        tracing::debug!(
            %message_id,
            %saga_id,
            destination,
            command_type = message.command.command_type(),
            "command sent"
        );
        metrics::counter!("commands_sent_total").increment(1);

        state
            .queues
            .entry(destination.to_string())
            .or_default()
            .push_back(message);
        state.sent_total += 1;

        Ok(message_id)
    }
}
