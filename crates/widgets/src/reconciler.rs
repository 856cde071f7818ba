//! Decides between sending a fresh message and updating the one a widget already
//! owns, and delivers multi-message pages in slot order.

use std::sync::Arc;
use std::time::Duration;

use snafu::ResultExt;

use super::MessageTransport;
use super::error::{DeliverySnafu, WidgetResult};
use super::ids::{ChatId, MessageId};
use super::types::{Delivery, DeliveryKind, InteractionEvent, MessageContent, OutgoingMessage};

/// Where one slot of a fan-out goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTarget {
    Send { requested_id: Option<MessageId> },
    Update(MessageId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotDelivery {
    pub target: SlotTarget,
    pub content: MessageContent,
}

#[derive(Clone)]
pub struct Reconciler {
    transport: Arc<dyn MessageTransport>,
    delay: Duration,
}

impl Reconciler {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            transport,
            delay: Duration::ZERO,
        }
    }

    /// Pause inserted between consecutive deliveries of one fan-out.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Updates the clicked message when it belongs to a widget, otherwise sends.
    pub async fn send_or_update(
        &self,
        event: &InteractionEvent,
        content: MessageContent,
    ) -> WidgetResult<Delivery> {
        match event.source_message_id {
            Some(message_id) if event.payload.is_widget_round() => {
                self.update(event.chat_id, message_id, content, None).await?;
                Ok(Delivery {
                    message_id,
                    kind: DeliveryKind::Updated,
                })
            }
            _ => {
                let message_id = self.send(event.chat_id, None, content, None).await?;
                Ok(Delivery {
                    message_id,
                    kind: DeliveryKind::Sent,
                })
            }
        }
    }

    /// Delivers `slots` strictly in order. A failure stops the fan-out; slots already
    /// delivered stay as they are.
    pub async fn fan_out(
        &self,
        chat_id: ChatId,
        slots: Vec<SlotDelivery>,
    ) -> WidgetResult<Vec<MessageId>> {
        let mut delivered = Vec::with_capacity(slots.len());

        for (slot, delivery) in slots.into_iter().enumerate() {
            if slot > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let result = match delivery.target {
                SlotTarget::Send { requested_id } => {
                    self.send(chat_id, requested_id, delivery.content, Some(slot))
                        .await
                }
                SlotTarget::Update(message_id) => self
                    .update(chat_id, message_id, delivery.content, Some(slot))
                    .await
                    .map(|()| message_id),
            };

            match result {
                Ok(message_id) => delivered.push(message_id),
                Err(error) => {
                    tracing::warn!(
                        slot,
                        delivered = delivered.len(),
                        error = %error,
                        "fan-out stopped; earlier slots are left as delivered"
                    );
                    return Err(error);
                }
            }
        }

        Ok(delivered)
    }

    pub(crate) async fn send(
        &self,
        chat_id: ChatId,
        requested_id: Option<MessageId>,
        content: MessageContent,
        slot: Option<usize>,
    ) -> WidgetResult<MessageId> {
        let message_id = self
            .transport
            .send(
                chat_id,
                OutgoingMessage {
                    requested_id,
                    content,
                },
            )
            .await
            .context(DeliverySnafu {
                stage: "reconciler-send",
                slot,
                message_id: requested_id,
            })?;

        tracing::debug!(%chat_id, %message_id, ?slot, "sent widget message");
        Ok(message_id)
    }

    pub(crate) async fn update(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        content: MessageContent,
        slot: Option<usize>,
    ) -> WidgetResult<()> {
        self.transport
            .update(chat_id, message_id, content)
            .await
            .context(DeliverySnafu {
                stage: "reconciler-update",
                slot,
                message_id: Some(message_id),
            })?;

        tracing::debug!(%chat_id, %message_id, ?slot, "updated widget message");
        Ok(())
    }
}
