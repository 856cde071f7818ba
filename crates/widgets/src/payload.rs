//! Key-value state carried by every control and echoed back on activation.
//!
//! Each widget kind owns a handful of reserved keys. [`StateCodec`] implementations
//! read only their own keys and leave everything else untouched, so several widgets
//! can share one message.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{DecodeStateSnafu, WidgetResult};

/// Set to `true` on every control a widget emits. Its presence on an inbound event
/// means the clicked message belongs to a widget and can be updated in place.
pub const WIDGET_MARKER_KEY: &str = "pybotx_widget";

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Builder form of [`Payload::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Copies every entry of `other` over this payload.
    pub fn extend(&mut self, other: &Payload) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_widget_round(&self) -> bool {
        matches!(self.0.get(WIDGET_MARKER_KEY), Some(Value::Bool(true)))
    }

    pub fn mark_widget(&mut self) {
        self.insert(WIDGET_MARKER_KEY, true);
    }

    /// Reads a scalar as text. Numbers and booleans are accepted since hosts may
    /// hand back content items that were never strings.
    pub fn text(&self, key: &'static str, stage: &'static str) -> WidgetResult<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => scalar_to_string(value)
                .map(Some)
                .ok_or_else(|| decode_error(stage, key, value, "string")),
        }
    }

    pub fn integer(&self, key: &'static str, stage: &'static str) -> WidgetResult<Option<i64>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(number) => number.as_i64(),
            Value::String(raw) => raw.trim().parse::<i64>().ok(),
            _ => None,
        };

        parsed
            .map(Some)
            .ok_or_else(|| decode_error(stage, key, value, "integer"))
    }

    pub fn text_list(
        &self,
        key: &'static str,
        stage: &'static str,
    ) -> WidgetResult<Option<Vec<String>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let Value::Array(items) = value else {
            return Err(decode_error(stage, key, value, "list"));
        };

        items
            .iter()
            .map(|item| {
                scalar_to_string(item)
                    .ok_or_else(|| decode_error(stage, key, value, "list of strings"))
            })
            .collect::<WidgetResult<Vec<_>>>()
            .map(Some)
    }

    pub fn date(&self, key: &'static str, stage: &'static str) -> WidgetResult<Option<NaiveDate>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let Value::String(raw) = value else {
            return Err(decode_error(stage, key, value, "date"));
        };

        parse_date(raw)
            .map(Some)
            .ok_or_else(|| decode_error(stage, key, value, "date"))
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl From<Payload> for Map<String, Value> {
    fn from(value: Payload) -> Self {
        value.0
    }
}

/// Reads and writes one widget's reserved keys.
pub trait StateCodec: Sized {
    const KEYS: &'static [&'static str];

    fn decode(payload: &Payload) -> WidgetResult<Self>;

    fn encode(&self, payload: &mut Payload);

    fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        self.encode(&mut payload);
        payload
    }

    fn clear(payload: &mut Payload) {
        for key in Self::KEYS {
            payload.remove(key);
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|value| value.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|value| value.date_naive())
        })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn decode_error(
    stage: &'static str,
    key: &'static str,
    value: &Value,
    expected: &'static str,
) -> super::error::WidgetError {
    DecodeStateSnafu {
        stage,
        key,
        raw: value.to_string(),
        expected,
    }
    .build()
}
