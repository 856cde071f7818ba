//! Widget engines. Each one rebuilds its state from the inbound event, then either
//! renders the next round or resolves a final value.

pub mod calendar;
pub mod carousel;
pub mod checklist;
pub mod checktable;
pub mod pagination;

pub use calendar::{Calendar, CalendarConfig, CalendarState};
pub use carousel::{Carousel, CarouselConfig, CarouselState};
pub use checklist::{Checklist, ChecklistRender, ChecklistState};
pub use checktable::{CheckboxContent, Checktable, Held};
pub use pagination::{Pagination, PaginationConfig, PaginationReport, PaginationState};

use super::error::WidgetResult;
use super::markup::Markup;
use super::payload::Payload;
use super::reconciler::Reconciler;
use super::types::{InteractionEvent, MessageContent};

/// Routing command plus the caller's extra rows, shared by every engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetContext {
    pub command: String,
    pub extra_markup: Option<Markup>,
}

impl WidgetContext {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            extra_markup: None,
        }
    }

    pub fn with_extra_markup(mut self, markup: Markup) -> Self {
        self.extra_markup = Some(markup);
        self
    }

    /// Appends the caller's rows below the widget's own.
    pub fn attach_extra(&self, markup: Markup) -> Markup {
        match &self.extra_markup {
            Some(extra) => markup.merge(extra.clone()),
            None => markup,
        }
    }

    /// The event payload with the widget marker set; every emitted control starts here.
    pub(crate) fn base_payload(&self, event_payload: &Payload) -> Payload {
        let mut payload = event_payload.clone();
        payload.mark_widget();
        payload
    }
}

/// One rendered message together with the state it encodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub text: String,
    pub markup: Markup,
    pub payload: Payload,
}

impl Frame {
    pub fn into_content(self) -> MessageContent {
        MessageContent::new(self.text).with_markup(self.markup)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Interaction continues; show `Frame` and wait for the next click.
    Pending(Frame),
    /// Terminal round. The widget's keys are already cleared from `confirmation.payload`.
    Resolved { value: T, confirmation: Frame },
}

impl<T> Outcome<T> {
    pub fn frame(&self) -> &Frame {
        match self {
            Outcome::Pending(frame) => frame,
            Outcome::Resolved { confirmation, .. } => confirmation,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Pending(_) => None,
            Outcome::Resolved { value, .. } => Some(value),
        }
    }
}

pub(crate) async fn deliver_outcome<T>(
    reconciler: &Reconciler,
    event: &InteractionEvent,
    outcome: Outcome<T>,
) -> WidgetResult<Option<T>> {
    match outcome {
        Outcome::Pending(frame) => {
            reconciler.send_or_update(event, frame.into_content()).await?;
            Ok(None)
        }
        Outcome::Resolved {
            value,
            confirmation,
        } => {
            reconciler
                .send_or_update(event, confirmation.into_content())
                .await?;
            Ok(Some(value))
        }
    }
}
