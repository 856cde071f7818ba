use snafu::Snafu;

use super::ids::MessageId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WidgetError {
    #[snafu(display("template '{template_name}' is invalid: {details}"))]
    InvalidTemplate {
        stage: &'static str,
        template_name: &'static str,
        details: String,
    },
    #[snafu(display("start offset {start_from} is greater than content length {content_len}"))]
    StartOutOfRange {
        stage: &'static str,
        start_from: usize,
        content_len: usize,
    },
    #[snafu(display("display modes '{first}' and '{second}' cannot be enabled together"))]
    ConflictingModes {
        stage: &'static str,
        first: &'static str,
        second: &'static str,
    },
    #[snafu(display("mapping of checkbox '{label}' does not contain value '{value}'"))]
    UnmappedValue {
        stage: &'static str,
        label: String,
        value: String,
    },
    #[snafu(display("widget configuration is invalid: {details}"))]
    InvalidConfig { stage: &'static str, details: String },
    #[snafu(display("state key '{key}' holds '{raw}' which is not a valid {expected}"))]
    DecodeState {
        stage: &'static str,
        key: &'static str,
        raw: String,
        expected: &'static str,
    },
    #[snafu(display("invalid {id_type} '{raw}'"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        source: uuid::Error,
    },
    #[snafu(display("no value was selected under state key '{key}'"))]
    MissingSelection { stage: &'static str, key: &'static str },
    #[snafu(display("delivery failed at `{stage}` (slot {slot:?}, message {message_id:?}): {source}"))]
    Delivery {
        stage: &'static str,
        slot: Option<usize>,
        message_id: Option<MessageId>,
        source: TransportError,
    },
}

pub type WidgetResult<T> = Result<T, WidgetError>;

/// Failures reported by a host transport. Hosts construct these directly.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum TransportError {
    #[snafu(display("host rejected the message: {details}"))]
    Rejected { details: String },
    #[snafu(display("host does not know message '{message_id}'"))]
    UnknownMessage { message_id: MessageId },
    #[snafu(display("host is unavailable: {details}"))]
    Unavailable { details: String },
}

pub type TransportResult<T> = Result<T, TransportError>;
