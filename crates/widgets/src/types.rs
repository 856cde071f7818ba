use serde::{Deserialize, Serialize};

use super::ids::{ChatId, MessageId};
use super::markup::Markup;
use super::payload::Payload;

/// Inbound trigger: a typed command or a click on a previously emitted control.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEvent {
    pub chat_id: ChatId,
    /// Full command body, e.g. `/calendar ⬅️`.
    pub command: String,
    /// Payload of the clicked control, or empty for a typed command.
    pub payload: Payload,
    /// Message that carried the clicked control.
    pub source_message_id: Option<MessageId>,
}

impl InteractionEvent {
    pub fn new(chat_id: ChatId, command: impl Into<String>) -> Self {
        Self {
            chat_id,
            command: command.into(),
            payload: Payload::new(),
            source_message_id: None,
        }
    }

    /// Builds the event a host would deliver after `control` on `message_id` is clicked.
    pub fn from_click(
        chat_id: ChatId,
        message_id: MessageId,
        control: &super::markup::Control,
    ) -> Self {
        Self {
            chat_id,
            command: control.command.clone(),
            payload: control.payload.clone(),
            source_message_id: Some(message_id),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_source_message(mut self, message_id: MessageId) -> Self {
        self.source_message_id = Some(message_id);
        self
    }

    /// First whitespace-separated token of the command body.
    pub fn command_name(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or_default()
    }

    /// Everything after the command name, trimmed.
    pub fn argument(&self) -> &str {
        let trimmed = self.command.trim_start();
        match trimmed.split_once(char::is_whitespace) {
            Some((_, rest)) => rest.trim(),
            None => "",
        }
    }
}

/// File reference passed through to the host untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: String,
    pub uri: String,
}

/// Everything one physical message shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    pub text: String,
    #[serde(default)]
    pub markup: Markup,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

impl MessageContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: Markup::new(),
            attachment: None,
        }
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// A fresh message. Hosts that let callers choose ids should honour `requested_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub requested_id: Option<MessageId>,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryKind {
    Sent,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Delivery {
    pub message_id: MessageId,
    pub kind: DeliveryKind,
}

/// One entry of carousel or checklist content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentItem {
    Scalar(String),
    /// Rendered as a single row of controls.
    Row(Vec<String>),
}

impl ContentItem {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            ContentItem::Scalar(value) => std::slice::from_ref(value),
            ContentItem::Row(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

impl From<&str> for ContentItem {
    fn from(value: &str) -> Self {
        ContentItem::Scalar(value.to_string())
    }
}

impl From<String> for ContentItem {
    fn from(value: String) -> Self {
        ContentItem::Scalar(value)
    }
}

impl From<Vec<String>> for ContentItem {
    fn from(values: Vec<String>) -> Self {
        ContentItem::Row(values)
    }
}

impl<const N: usize> From<[&str; N]> for ContentItem {
    fn from(values: [&str; N]) -> Self {
        ContentItem::Row(values.iter().map(|value| value.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_is_text_after_command_name() {
        let event = InteractionEvent::new(ChatId::new_v7(), "/calendar  ⬅️ ");
        assert_eq!(event.command_name(), "/calendar");
        assert_eq!(event.argument(), "⬅️");

        let bare = InteractionEvent::new(ChatId::new_v7(), "/calendar");
        assert_eq!(bare.argument(), "");
    }

    #[test]
    fn row_items_expose_every_value() {
        let item = ContentItem::from(["x", "y"]);
        assert_eq!(item.values().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(ContentItem::from("z").values().collect::<Vec<_>>(), vec!["z"]);
    }
}
