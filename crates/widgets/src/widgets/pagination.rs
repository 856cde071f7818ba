//! Spreads a list of prepared messages over a fixed number of physical messages
//! ("slots") and pages through it by updating those slots in place.

use std::time::Duration;

use serde_json::Value;

use super::WidgetContext;
use crate::error::{DecodeStateSnafu, WidgetResult};
use crate::ids::MessageId;
use crate::markup::{Control, Markup};
use crate::payload::{Payload, StateCodec};
use crate::reconciler::{Reconciler, SlotDelivery, SlotTarget};
use crate::settings::PaginationStrings;
use crate::types::{DeliveryKind, InteractionEvent, MessageContent};
use crate::validate::{ensure_named_placeholders, ensure_positive, fill_named};

pub const START_FROM_KEY: &str = "pagination_start_from";
pub const MESSAGE_IDS_KEY: &str = "pagination_message_ids";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    pub start_from: usize,
    /// One per slot; empty until the first page was sent.
    pub message_ids: Vec<MessageId>,
}

impl StateCodec for PaginationState {
    const KEYS: &'static [&'static str] = &[START_FROM_KEY, MESSAGE_IDS_KEY];

    fn decode(payload: &Payload) -> WidgetResult<Self> {
        let start_from = match payload.integer(START_FROM_KEY, "pagination-decode-start")? {
            None => 0,
            Some(raw) => usize::try_from(raw).map_err(|_| {
                DecodeStateSnafu {
                    stage: "pagination-decode-start",
                    key: START_FROM_KEY,
                    raw: raw.to_string(),
                    expected: "non-negative offset",
                }
                .build()
            })?,
        };

        let message_ids = payload
            .text_list(MESSAGE_IDS_KEY, "pagination-decode-ids")?
            .unwrap_or_default()
            .into_iter()
            .map(|raw| MessageId::parse_at(&raw, "pagination-decode-ids"))
            .collect::<WidgetResult<Vec<_>>>()?;

        Ok(Self {
            start_from,
            message_ids,
        })
    }

    fn encode(&self, payload: &mut Payload) {
        payload.insert(START_FROM_KEY, self.start_from as u64);
        payload.insert(
            MESSAGE_IDS_KEY,
            Value::from(
                self.message_ids
                    .iter()
                    .copied()
                    .map(Value::from)
                    .collect::<Vec<_>>(),
            ),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Number of physical messages.
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: 1 }
    }
}

/// What one pagination round delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationReport {
    pub start_from: usize,
    /// Host ids in slot order.
    pub message_ids: Vec<MessageId>,
    pub kind: DeliveryKind,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    context: WidgetContext,
    content: Vec<MessageContent>,
    page_size: usize,
    strings: PaginationStrings,
}

impl Pagination {
    pub fn new(
        context: WidgetContext,
        content: Vec<MessageContent>,
        config: PaginationConfig,
        strings: PaginationStrings,
    ) -> WidgetResult<Self> {
        const STAGE: &str = "pagination-new";
        const BOUNDS: &[&str] = &["left_num", "right_num"];

        ensure_positive(config.page_size, "page_size", STAGE)?;
        ensure_named_placeholders(&strings.backward_template, "backward_template", BOUNDS, STAGE)?;
        ensure_named_placeholders(&strings.forward_template, "forward_template", BOUNDS, STAGE)?;

        Ok(Self {
            context,
            content,
            page_size: config.page_size,
            strings,
        })
    }

    /// Content fits on one page; every item goes out as its own message, no controls.
    pub fn fits_one_page(&self) -> bool {
        self.content.len() <= self.page_size
    }

    /// Reads the page offset and slot ids, rejecting state this content cannot have produced.
    pub fn state(&self, event: &InteractionEvent) -> WidgetResult<PaginationState> {
        let state = PaginationState::decode(&event.payload)?;

        if !state.message_ids.is_empty() && state.message_ids.len() != self.page_size {
            return DecodeStateSnafu {
                stage: "pagination-state-ids",
                key: MESSAGE_IDS_KEY,
                raw: state.message_ids.len().to_string(),
                expected: "one id per slot",
            }
            .fail();
        }
        if state.start_from > 0 && state.start_from >= self.content.len() {
            return DecodeStateSnafu {
                stage: "pagination-state-start",
                key: START_FROM_KEY,
                raw: state.start_from.to_string(),
                expected: "offset inside the content",
            }
            .fail();
        }

        Ok(state)
    }

    /// Backward/forward controls for the page at `start_from`.
    pub fn control_markup(
        &self,
        event: &InteractionEvent,
        start_from: usize,
        message_ids: &[MessageId],
    ) -> Markup {
        let len = self.content.len();
        let base = self.context.base_payload(&event.payload);
        let control = |label: String, target: usize| {
            let mut payload = base.clone();
            PaginationState {
                start_from: target,
                message_ids: message_ids.to_vec(),
            }
            .encode(&mut payload);
            Control::new(label, self.context.command.as_str(), payload)
        };

        let mut markup = Markup::new();
        if start_from > 0 {
            let target = start_from.saturating_sub(self.page_size);
            let label = self.range_label(&self.strings.backward_template, target + 1, start_from);
            markup.add_control(control(label, target));
        }
        if start_from + self.page_size < len {
            let target = start_from + self.page_size;
            let right = (target + self.page_size).min(len);
            let label = self.range_label(&self.strings.forward_template, target + 1, right);
            markup.add_inline_control(control(label, target));
        }
        markup
    }

    /// Content of every slot for the page at `start_from`; controls ride on the last slot.
    pub fn page(
        &self,
        event: &InteractionEvent,
        start_from: usize,
        message_ids: &[MessageId],
    ) -> Vec<MessageContent> {
        let mut slots = (0..self.page_size)
            .map(|slot| {
                self.content
                    .get(start_from + slot)
                    .cloned()
                    .unwrap_or_else(|| MessageContent::new(self.strings.empty_message.as_str()))
            })
            .collect::<Vec<_>>();

        if let Some(last) = slots.last_mut() {
            let controls = self.control_markup(event, start_from, message_ids);
            let markup = std::mem::take(&mut last.markup).merge(controls);
            last.markup = self.context.attach_extra(markup);
        }
        slots
    }

    pub async fn display(
        &self,
        event: &InteractionEvent,
        reconciler: &Reconciler,
    ) -> WidgetResult<PaginationReport> {
        if self.fits_one_page() {
            let slots = self
                .content
                .iter()
                .map(|content| SlotDelivery {
                    target: SlotTarget::Send { requested_id: None },
                    content: content.clone(),
                })
                .collect();
            let message_ids = reconciler.fan_out(event.chat_id, slots).await?;
            tracing::debug!(widget = "pagination", sent = message_ids.len(), "content fits one page");
            return Ok(PaginationReport {
                start_from: 0,
                message_ids,
                kind: DeliveryKind::Sent,
            });
        }

        let state = self.state(event)?;
        if state.message_ids.is_empty() {
            self.send_first_page(event, reconciler, state.start_from).await
        } else {
            self.update_page(event, reconciler, state).await
        }
    }

    async fn send_first_page(
        &self,
        event: &InteractionEvent,
        reconciler: &Reconciler,
        start_from: usize,
    ) -> WidgetResult<PaginationReport> {
        let requested = (0..self.page_size)
            .map(|_| MessageId::new_v7())
            .collect::<Vec<_>>();
        let slots = self
            .page(event, start_from, &requested)
            .into_iter()
            .zip(&requested)
            .map(|(content, message_id)| SlotDelivery {
                target: SlotTarget::Send {
                    requested_id: Some(*message_id),
                },
                content,
            })
            .collect();

        let delivered = reconciler.fan_out(event.chat_id, slots).await?;
        if delivered != requested {
            self.repoint_last_slot(event, reconciler, start_from, &delivered)
                .await?;
        }

        tracing::info!(
            widget = "pagination",
            start_from,
            slots = delivered.len(),
            "sent first page"
        );
        Ok(PaginationReport {
            start_from,
            message_ids: delivered,
            kind: DeliveryKind::Sent,
        })
    }

    /// The host chose its own ids; the controls on the last slot must point at them.
    async fn repoint_last_slot(
        &self,
        event: &InteractionEvent,
        reconciler: &Reconciler,
        start_from: usize,
        delivered: &[MessageId],
    ) -> WidgetResult<()> {
        let (Some(content), Some(message_id)) = (
            self.page(event, start_from, delivered).pop(),
            delivered.last().copied(),
        ) else {
            return Ok(());
        };

        tracing::debug!(
            widget = "pagination",
            %message_id,
            "host assigned different ids; updating controls on last slot"
        );
        pause(reconciler.delay()).await;
        reconciler
            .update(event.chat_id, message_id, content, Some(delivered.len() - 1))
            .await
    }

    async fn update_page(
        &self,
        event: &InteractionEvent,
        reconciler: &Reconciler,
        state: PaginationState,
    ) -> WidgetResult<PaginationReport> {
        let slots = self
            .page(event, state.start_from, &state.message_ids)
            .into_iter()
            .zip(&state.message_ids)
            .map(|(content, message_id)| SlotDelivery {
                target: SlotTarget::Update(*message_id),
                content,
            })
            .collect();

        let message_ids = reconciler.fan_out(event.chat_id, slots).await?;

        tracing::info!(
            widget = "pagination",
            start_from = state.start_from,
            slots = message_ids.len(),
            "updated page in place"
        );
        Ok(PaginationReport {
            start_from: state.start_from,
            message_ids,
            kind: DeliveryKind::Updated,
        })
    }

    fn range_label(&self, template: &str, left: usize, right: usize) -> String {
        fill_named(
            template,
            &[
                ("left_num", left.to_string().as_str()),
                ("right_num", right.to_string().as_str()),
            ],
        )
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
