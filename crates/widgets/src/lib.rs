pub mod error;
pub mod ids;
pub mod markup;
pub mod memory;
pub mod payload;
pub mod reconciler;
pub mod settings;
pub mod types;
pub(crate) mod validate;
pub mod widgets;

use futures::future::BoxFuture;

pub use error::{TransportError, TransportResult, WidgetError, WidgetResult};
pub use ids::{ChatId, MessageId};
pub use markup::{Control, Markup};
pub use memory::MemoryTransport;
pub use payload::{Payload, StateCodec, WIDGET_MARKER_KEY};
pub use reconciler::Reconciler;
pub use settings::{SettingsStore, WidgetSettings};
pub use types::{
    Attachment, ContentItem, Delivery, DeliveryKind, InteractionEvent, MessageContent,
    OutgoingMessage,
};
pub use widgets::{
    Calendar, CalendarConfig, Carousel, CarouselConfig, CheckboxContent, Checklist, Checktable,
    Frame, Held, Outcome, Pagination, PaginationConfig, WidgetContext,
};

/// Host messaging runtime. Implementations own retries and network I/O.
pub trait MessageTransport: Send + Sync {
    /// Emits a new message and returns the id the host assigned to it.
    fn send<'a>(
        &'a self,
        chat_id: ChatId,
        message: OutgoingMessage,
    ) -> BoxFuture<'a, TransportResult<MessageId>>;

    /// Replaces text and controls of a previously sent message.
    fn update<'a>(
        &'a self,
        chat_id: ChatId,
        message_id: MessageId,
        content: MessageContent,
    ) -> BoxFuture<'a, TransportResult<()>>;
}
