//! Host message and chat identities. Inside a payload both travel as hyphenated uuid
//! strings, so an id read back from a click is parsed with the same rules it was
//! written with.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use snafu::ResultExt;
use uuid::Uuid;

use super::error::{InvalidIdSnafu, WidgetError, WidgetResult};

macro_rules! define_widget_id {
    ($name:ident, $id_type:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn parse(raw: &str) -> WidgetResult<Self> {
                Self::parse_at(raw, concat!("parse-", $id_type))
            }

            /// Parses an id read at `stage`, e.g. from a payload list.
            pub fn parse_at(raw: &str, stage: &'static str) -> WidgetResult<Self> {
                let parsed = Uuid::parse_str(raw.trim()).context(InvalidIdSnafu {
                    stage,
                    id_type: $id_type,
                    raw: raw.to_string(),
                })?;
                Ok(Self(parsed))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = WidgetError;

            fn from_str(raw: &str) -> WidgetResult<Self> {
                Self::parse(raw)
            }
        }

        impl From<$name> for Value {
            fn from(id: $name) -> Self {
                Value::String(id.to_string())
            }
        }
    };
}

define_widget_id!(MessageId, "message-id");
define_widget_id!(ChatId, "chat-id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_display_parses_back() {
        let id = MessageId::new_v7();
        let parsed: MessageId = id.to_string().parse().expect("display form parses");
        assert_eq!(parsed, id);
    }

    #[test]
    fn payload_value_is_the_display_form() {
        let id = ChatId::new_v7();
        assert_eq!(Value::from(id), Value::String(id.to_string()));
    }

    #[test]
    fn garbage_names_the_id_type_and_stage() {
        match ChatId::parse_at("not-a-valid-uuid", "decode-chat") {
            Err(WidgetError::InvalidId {
                stage, id_type, raw, ..
            }) => {
                assert_eq!(stage, "decode-chat");
                assert_eq!(id_type, "chat-id");
                assert_eq!(raw, "not-a-valid-uuid");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(
            MessageId::parse(""),
            Err(WidgetError::InvalidId { stage: "parse-message-id", .. })
        ));
    }
}
