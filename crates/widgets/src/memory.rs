//! In-process host used by tests and the QA runner.

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use super::MessageTransport;
use super::error::{RejectedSnafu, TransportResult, UnknownMessageSnafu};
use super::ids::{ChatId, MessageId};
use super::types::{MessageContent, OutgoingMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Send,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub op: TransportOp,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub content: MessageContent,
}

#[derive(Debug, Default)]
struct MemoryState {
    calls: Vec<RecordedCall>,
    messages: Vec<StoredMessage>,
    attempts: usize,
    fail_on_attempt: Option<usize>,
}

/// Records every send/update and keeps the latest content of each message.
#[derive(Debug)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
    honour_requested_ids: bool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            honour_requested_ids: true,
        }
    }

    /// A host that always mints its own ids.
    pub fn ignoring_requested_ids() -> Self {
        Self {
            honour_requested_ids: false,
            ..Self::new()
        }
    }

    /// Makes the `attempt`-th call (1-based, counting sends and updates) fail.
    pub async fn fail_on_attempt(&self, attempt: usize) {
        self.state.lock().await.fail_on_attempt = Some(attempt);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn messages(&self) -> Vec<StoredMessage> {
        self.state.lock().await.messages.clone()
    }

    pub async fn message(&self, message_id: MessageId) -> Option<StoredMessage> {
        self.state
            .lock()
            .await
            .messages
            .iter()
            .find(|message| message.message_id == message_id)
            .cloned()
    }

    async fn send_inner(
        &self,
        chat_id: ChatId,
        message: OutgoingMessage,
    ) -> TransportResult<MessageId> {
        let mut state = self.state.lock().await;
        state.check_failure()?;

        let message_id = match message.requested_id {
            Some(requested)
                if self.honour_requested_ids
                    && !state.messages.iter().any(|stored| stored.message_id == requested) =>
            {
                requested
            }
            _ => MessageId::new_v7(),
        };

        state.calls.push(RecordedCall {
            op: TransportOp::Send,
            chat_id,
            message_id,
            content: message.content.clone(),
        });
        state.messages.push(StoredMessage {
            chat_id,
            message_id,
            content: message.content,
        });

        Ok(message_id)
    }

    async fn update_inner(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        content: MessageContent,
    ) -> TransportResult<()> {
        let mut state = self.state.lock().await;
        state.check_failure()?;

        let Some(stored) = state
            .messages
            .iter_mut()
            .find(|stored| stored.message_id == message_id && stored.chat_id == chat_id)
        else {
            return UnknownMessageSnafu { message_id }.fail();
        };
        stored.content = content.clone();

        state.calls.push(RecordedCall {
            op: TransportOp::Update,
            chat_id,
            message_id,
            content,
        });
        Ok(())
    }
}

impl MemoryState {
    fn check_failure(&mut self) -> TransportResult<()> {
        self.attempts += 1;
        if self.fail_on_attempt == Some(self.attempts) {
            return RejectedSnafu {
                details: format!("injected failure on attempt {}", self.attempts),
            }
            .fail();
        }
        Ok(())
    }
}

impl MessageTransport for MemoryTransport {
    fn send<'a>(
        &'a self,
        chat_id: ChatId,
        message: OutgoingMessage,
    ) -> BoxFuture<'a, TransportResult<MessageId>> {
        self.send_inner(chat_id, message).boxed()
    }

    fn update<'a>(
        &'a self,
        chat_id: ChatId,
        message_id: MessageId,
        content: MessageContent,
    ) -> BoxFuture<'a, TransportResult<()>> {
        self.update_inner(chat_id, message_id, content).boxed()
    }
}
