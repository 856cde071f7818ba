//! End-to-end click flows against the in-memory host: the first round sends, every
//! later click updates the same message, terminal rounds leave no controls behind.

use std::sync::Arc;
use std::time::Duration;

use bubbles_widgets::memory::{MemoryTransport, TransportOp};
use bubbles_widgets::settings::{
    CalendarStrings, CarouselStrings, ChecktableStrings, PaginationStrings,
};
use bubbles_widgets::{
    Attachment, Calendar, CalendarConfig, Carousel, CarouselConfig, ChatId, CheckboxContent,
    Checktable, ContentItem, Control, DeliveryKind, InteractionEvent, Markup, MessageContent, MessageId,
    Pagination, PaginationConfig, Payload, Reconciler, WidgetContext, WidgetError,
};
use chrono::NaiveDate;

fn host() -> (Arc<MemoryTransport>, Reconciler) {
    let transport = Arc::new(MemoryTransport::new());
    (transport.clone(), Reconciler::new(transport))
}

async fn click(
    transport: &MemoryTransport,
    chat_id: ChatId,
    message_id: MessageId,
    label: &str,
) -> InteractionEvent {
    let message = transport.message(message_id).await.expect("message stored");
    let control = message
        .content
        .markup
        .find_by_label(label)
        .unwrap_or_else(|| panic!("no control '{label}' in {:?}", message.content.markup.labels()));
    InteractionEvent::from_click(chat_id, message_id, control)
}

async fn only_message_id(transport: &MemoryTransport) -> MessageId {
    let messages = transport.messages().await;
    assert_eq!(messages.len(), 1);
    messages[0].message_id
}

#[tokio::test]
async fn carousel_browse_then_select_updates_one_message() {
    let (transport, reconciler) = host();
    let chat_id = ChatId::new_v7();
    let carousel = Carousel::new(
        WidgetContext::new("/pick"),
        CarouselConfig {
            looping: false,
            ..CarouselConfig::new(
                ["a", "b", "c", "d", "e"].into_iter().map(ContentItem::from),
                "Letter:",
            )
        },
        CarouselStrings::default(),
    )
    .expect("valid carousel");

    let opened = carousel
        .display(&InteractionEvent::new(chat_id, "/pick"), &reconciler)
        .await
        .expect("open");
    assert_eq!(opened, None);
    let message_id = only_message_id(&transport).await;

    let next = click(&transport, chat_id, message_id, "➡️").await;
    assert_eq!(carousel.display(&next, &reconciler).await.expect("next"), None);
    let shown = transport.message(message_id).await.expect("stored");
    assert_eq!(shown.content.markup.labels(), vec![vec!["⬅️", "d", "e"]]);

    let pick = click(&transport, chat_id, message_id, "e").await;
    let selected = carousel.display(&pick, &reconciler).await.expect("select");
    assert_eq!(selected.as_deref(), Some("e"));

    let confirmation = transport.message(message_id).await.expect("stored");
    assert_eq!(confirmation.content.text, "Letter: e");
    assert!(confirmation.content.markup.is_empty());

    let ops = transport
        .calls()
        .await
        .into_iter()
        .map(|call| call.op)
        .collect::<Vec<_>>();
    assert_eq!(ops, vec![TransportOp::Send, TransportOp::Update, TransportOp::Update]);
}

#[tokio::test]
async fn calendar_navigation_and_pick_stay_on_one_message() {
    let (transport, reconciler) = host();
    let chat_id = ChatId::new_v7();
    let today = NaiveDate::from_ymd_opt(2024, 5, 15).expect("date");
    let calendar = Calendar::new_at(
        WidgetContext::new("/date"),
        CalendarConfig::default(),
        CalendarStrings::default(),
        today,
    )
    .expect("valid calendar");

    calendar
        .display(&InteractionEvent::new(chat_id, "/date"), &reconciler)
        .await
        .expect("open");
    let message_id = only_message_id(&transport).await;

    let next_month = {
        let message = transport.message(message_id).await.expect("stored");
        let control = message.content.markup.rows()[1][2].clone();
        InteractionEvent::from_click(chat_id, message_id, &control)
    };
    assert_eq!(calendar.display(&next_month, &reconciler).await.expect("navigate"), None);

    let pick = click(&transport, chat_id, message_id, "3").await;
    let selected = calendar.display(&pick, &reconciler).await.expect("pick");
    assert_eq!(selected, NaiveDate::from_ymd_opt(2024, 6, 3));

    let confirmation = transport.message(message_id).await.expect("stored");
    assert_eq!(confirmation.content.text, "Date selected");
    assert!(confirmation.content.markup.is_empty());
    assert_eq!(transport.messages().await.len(), 1);
}

#[tokio::test]
async fn checktable_choose_then_one() {
    let (transport, reconciler) = host();
    let event = InteractionEvent::new(ChatId::new_v7(), "/form");
    let field = || {
        CheckboxContent::new("Quantity", "/quantity")
            .with_mapping([(1_i64, "One"), (2, "Two")])
            .expect("valid mapping")
            .with_data(Payload::new().with("field", "quantity"))
    };
    let chosen = field().with_value(1).expect("mapped value");

    for (checkbox, expected) in [(field(), "Choose"), (chosen, "One")] {
        let table = Checktable::new(
            WidgetContext::new("/form"),
            vec![checkbox],
            "Order",
            "/uncheck",
            ChecktableStrings::default(),
        )
        .expect("valid checktable");
        let delivery = table.display(&event, &reconciler).await.expect("display");
        assert_eq!(delivery.kind, DeliveryKind::Sent);

        let stored = transport.message(delivery.message_id).await.expect("stored");
        assert_eq!(stored.content.markup.rows()[0][1].label, expected);
    }
}

fn news(count: usize, extra: Option<Markup>) -> Pagination {
    let mut context = WidgetContext::new("/news");
    if let Some(extra) = extra {
        context = context.with_extra_markup(extra);
    }
    let content = (1..=count)
        .map(|index| MessageContent::new(format!("item {index}")))
        .collect();
    Pagination::new(
        context,
        content,
        PaginationConfig { page_size: 3 },
        PaginationStrings::default(),
    )
    .expect("valid pagination")
}

#[tokio::test]
async fn pagination_pages_forward_by_updating_slots_in_place() {
    let (transport, reconciler) = host();
    let chat_id = ChatId::new_v7();
    let mut extra = Markup::new();
    extra.add_control(Control::new("Close", "/close", Payload::new()));
    let pages = news(7, Some(extra));

    let first = pages
        .display(&InteractionEvent::new(chat_id, "/news"), &reconciler)
        .await
        .expect("first page");
    assert_eq!(first.kind, DeliveryKind::Sent);
    assert_eq!(first.message_ids.len(), 3);

    let last_slot = first.message_ids[2];
    let stored = transport.message(last_slot).await.expect("stored");
    assert_eq!(stored.content.markup.labels(), vec![vec!["4-6 ➡️"], vec!["Close"]]);

    let forward = click(&transport, chat_id, last_slot, "4-6 ➡️").await;
    let second = pages.display(&forward, &reconciler).await.expect("second page");
    assert_eq!(second.kind, DeliveryKind::Updated);
    assert_eq!(second.message_ids, first.message_ids);
    assert_eq!(second.start_from, 3);

    let forward = click(&transport, chat_id, last_slot, "7-7 ➡️").await;
    pages.display(&forward, &reconciler).await.expect("last page");

    let texts = transport
        .messages()
        .await
        .into_iter()
        .map(|message| message.content.text)
        .collect::<Vec<_>>();
    assert_eq!(texts, vec!["item 7", "-", "-"]);
    let stored = transport.message(last_slot).await.expect("stored");
    assert_eq!(stored.content.markup.labels(), vec![vec!["⬅️ 4-6"], vec!["Close"]]);

    let update_order = transport
        .calls()
        .await
        .into_iter()
        .filter(|call| call.op == TransportOp::Update)
        .map(|call| call.message_id)
        .collect::<Vec<_>>();
    assert_eq!(update_order.len(), 6);
    assert_eq!(update_order[..3], first.message_ids[..]);
    assert_eq!(update_order[3..], first.message_ids[..]);
}

#[tokio::test]
async fn pagination_passes_attachments_through() {
    let (transport, reconciler) = host();
    let attachment = Attachment {
        file_name: "report.pdf".to_string(),
        media_type: "application/pdf".to_string(),
        uri: "file:///tmp/report.pdf".to_string(),
    };
    let pages = Pagination::new(
        WidgetContext::new("/files"),
        vec![MessageContent::new("report").with_attachment(attachment.clone())],
        PaginationConfig { page_size: 2 },
        PaginationStrings::default(),
    )
    .expect("valid pagination");

    pages
        .display(&InteractionEvent::new(ChatId::new_v7(), "/files"), &reconciler)
        .await
        .expect("display");

    let messages = transport.messages().await;
    assert_eq!(messages[0].content.attachment, Some(attachment));
}

#[tokio::test]
async fn pagination_failure_names_the_slot_and_keeps_earlier_messages() {
    let (transport, reconciler) = host();
    transport.fail_on_attempt(2).await;

    let error = news(7, None)
        .display(&InteractionEvent::new(ChatId::new_v7(), "/news"), &reconciler)
        .await
        .expect_err("second send fails");

    match error {
        WidgetError::Delivery {
            slot, message_id, ..
        } => {
            assert_eq!(slot, Some(1));
            assert!(message_id.is_some());
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(transport.messages().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn pagination_delay_separates_deliveries() {
    let transport = Arc::new(MemoryTransport::new());
    let reconciler = Reconciler::new(transport.clone()).with_delay(Duration::from_millis(200));

    let started = tokio::time::Instant::now();
    news(7, None)
        .display(&InteractionEvent::new(ChatId::new_v7(), "/news"), &reconciler)
        .await
        .expect("first page");

    assert!(started.elapsed() >= Duration::from_millis(400));
    assert_eq!(transport.messages().await.len(), 3);
}
