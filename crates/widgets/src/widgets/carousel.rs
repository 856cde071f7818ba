//! Sliding window over a fixed list of choices.
//!
//! The cursor (`carousel_start_from`) moves by one window per arrow click and wraps
//! toroidally: an offset outside `[0, len]` becomes `|len - |offset||`.

use snafu::ensure;

use super::{Frame, Outcome, WidgetContext, deliver_outcome};
use crate::error::{InvalidConfigSnafu, WidgetResult};
use crate::markup::{Control, Markup};
use crate::payload::{Payload, StateCodec};
use crate::reconciler::Reconciler;
use crate::settings::{CarouselStrings, WidgetDefaults};
use crate::types::{ContentItem, InteractionEvent};
use crate::validate::{
    ensure_exclusive, ensure_named_placeholders, ensure_positional_pair, ensure_positive,
    ensure_start_in_range, fill_named, fill_positional,
};

pub const START_FROM_KEY: &str = "carousel_start_from";
pub const SELECTED_VALUE_KEY: &str = "carousel_selected_val";
pub const SELECTED_VALUE_LABEL_KEY: &str = "carousel_selected_value_label";
pub const MESSAGE_LABEL_KEY: &str = "carousel_message_label";

pub const LEFT_PRESSED: &str = "CAROUSEL_LEFT_BUTTON_PRESSED";
pub const RIGHT_PRESSED: &str = "CAROUSEL_RIGHT_BUTTON_PRESSED";

/// Set by some hosts on inbound payloads; dropped together with the carousel keys.
const HOST_MESSAGE_ID_KEY: &str = "message_id";

/// What the last click on a carousel meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Previous,
    Next,
    Item(String),
}

impl Selection {
    fn from_raw(raw: String) -> Option<Self> {
        match raw.as_str() {
            "" => None,
            LEFT_PRESSED => Some(Selection::Previous),
            RIGHT_PRESSED => Some(Selection::Next),
            _ => Some(Selection::Item(raw)),
        }
    }

    pub fn as_raw(&self) -> &str {
        match self {
            Selection::Previous => LEFT_PRESSED,
            Selection::Next => RIGHT_PRESSED,
            Selection::Item(value) => value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarouselState {
    pub start_from: Option<i64>,
    pub selection: Option<Selection>,
    pub selected_value_label: Option<String>,
    pub message_label: Option<String>,
}

impl StateCodec for CarouselState {
    const KEYS: &'static [&'static str] = &[
        START_FROM_KEY,
        SELECTED_VALUE_KEY,
        SELECTED_VALUE_LABEL_KEY,
        MESSAGE_LABEL_KEY,
    ];

    fn decode(payload: &Payload) -> WidgetResult<Self> {
        Ok(Self {
            start_from: payload.integer(START_FROM_KEY, "carousel-decode-start")?,
            selection: payload
                .text(SELECTED_VALUE_KEY, "carousel-decode-selection")?
                .and_then(Selection::from_raw),
            selected_value_label: payload
                .text(SELECTED_VALUE_LABEL_KEY, "carousel-decode-template")?,
            message_label: payload.text(MESSAGE_LABEL_KEY, "carousel-decode-label")?,
        })
    }

    fn encode(&self, payload: &mut Payload) {
        if let Some(start_from) = self.start_from {
            payload.insert(START_FROM_KEY, start_from);
        }
        if let Some(selection) = &self.selection {
            payload.insert(SELECTED_VALUE_KEY, selection.as_raw());
        }
        if let Some(template) = &self.selected_value_label {
            payload.insert(SELECTED_VALUE_LABEL_KEY, template.as_str());
        }
        if let Some(label) = &self.message_label {
            payload.insert(MESSAGE_LABEL_KEY, label.as_str());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselConfig {
    pub content: Vec<ContentItem>,
    /// Message text while browsing; also the `{label}` of the confirmation.
    pub label: String,
    pub start_from: usize,
    pub displayed_count: usize,
    /// Overrides the previous/next labels from the string table.
    pub control_labels: Option<(String, String)>,
    pub inline: bool,
    pub looping: bool,
    pub show_numbers: bool,
}

impl CarouselConfig {
    pub fn new(content: impl IntoIterator<Item = ContentItem>, label: impl Into<String>) -> Self {
        Self::with_defaults(content, label, &WidgetDefaults::default())
    }

    /// Takes the window size from configured widget defaults.
    pub fn with_defaults(
        content: impl IntoIterator<Item = ContentItem>,
        label: impl Into<String>,
        defaults: &WidgetDefaults,
    ) -> Self {
        Self {
            content: content.into_iter().collect(),
            label: label.into(),
            start_from: 0,
            displayed_count: defaults.carousel_displayed_count,
            control_labels: None,
            inline: true,
            looping: true,
            show_numbers: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Carousel {
    context: WidgetContext,
    config: CarouselConfig,
    selected_value_template: String,
    left_label: String,
    right_label: String,
}

impl Carousel {
    pub fn new(
        context: WidgetContext,
        config: CarouselConfig,
        strings: CarouselStrings,
    ) -> WidgetResult<Self> {
        const STAGE: &str = "carousel-new";

        ensure_named_placeholders(
            &strings.selected_value_label,
            "selected_value_label",
            &["selected_val"],
            STAGE,
        )?;
        ensure_positive(config.displayed_count, "displayed_count", STAGE)?;
        ensure_start_in_range(config.start_from, config.content.len(), STAGE)?;
        // An empty value reads back as "nothing selected".
        ensure!(
            config
                .content
                .iter()
                .flat_map(|item| item.values())
                .all(|value| !value.is_empty()),
            InvalidConfigSnafu {
                stage: STAGE,
                details: "carousel values must not be empty".to_string(),
            }
        );
        ensure_exclusive(
            ("loop", config.looping),
            ("show_numbers", config.show_numbers),
            STAGE,
        )?;
        ensure_exclusive(
            ("inline", config.inline),
            ("show_numbers", config.show_numbers),
            STAGE,
        )?;

        let (left_label, right_label) = match (&config.control_labels, config.show_numbers) {
            (Some((left, right)), _) => (left.clone(), right.clone()),
            (None, true) => (strings.left_numbered.clone(), strings.right_numbered.clone()),
            (None, false) => (strings.left_arrow.clone(), strings.right_arrow.clone()),
        };
        if config.show_numbers {
            ensure_positional_pair(&left_label, "left_control_label", STAGE)?;
            ensure_positional_pair(&right_label, "right_control_label", STAGE)?;
        }

        Ok(Self {
            context,
            config,
            selected_value_template: strings.selected_value_label,
            left_label,
            right_label,
        })
    }

    pub fn render(&self, event: &InteractionEvent) -> WidgetResult<Outcome<String>> {
        let state = CarouselState::decode(&event.payload)?;

        let step = self.config.displayed_count as i64;
        let mut offset = state
            .start_from
            .unwrap_or(self.config.start_from as i64);
        match &state.selection {
            Some(Selection::Item(value)) => return Ok(self.resolve(event, &state, value.clone())),
            Some(Selection::Previous) => offset = offset.saturating_sub(step),
            Some(Selection::Next) => offset = offset.saturating_add(step),
            None => {}
        }
        let start = wrap_offset(offset, self.config.content.len());

        let mut base = self.context.base_payload(&event.payload);
        base.remove(SELECTED_VALUE_KEY);
        CarouselState {
            start_from: Some(start as i64),
            selection: None,
            selected_value_label: Some(self.selected_value_template.clone()),
            message_label: Some(self.config.label.clone()),
        }
        .encode(&mut base);

        let (show_left, show_right) = self.arrow_visibility(start);
        let arrow_command = event.command_name();
        let left = show_left.then(|| {
            Control::new(
                self.left_arrow_label(start),
                arrow_command,
                base.clone().with(SELECTED_VALUE_KEY, LEFT_PRESSED),
            )
        });
        let right = show_right.then(|| {
            Control::new(
                self.right_arrow_label(start),
                arrow_command,
                base.clone().with(SELECTED_VALUE_KEY, RIGHT_PRESSED),
            )
        });

        let window = self.window(start);
        let markup = if self.config.inline {
            self.inline_markup(&base, &window, left, right)
        } else {
            self.newline_markup(&base, &window, left, right)
        };

        tracing::debug!(
            widget = "carousel",
            start_from = start,
            visible = window.len(),
            show_left,
            show_right,
            "rendered carousel window"
        );

        Ok(Outcome::Pending(Frame {
            text: self.config.label.clone(),
            markup: self.context.attach_extra(markup),
            payload: base,
        }))
    }

    pub async fn display(
        &self,
        event: &InteractionEvent,
        reconciler: &Reconciler,
    ) -> WidgetResult<Option<String>> {
        let outcome = self.render(event)?;
        deliver_outcome(reconciler, event, outcome).await
    }

    /// The concrete item an event selected, if it selected one.
    pub fn selected_value(event: &InteractionEvent) -> WidgetResult<Option<String>> {
        Ok(match CarouselState::decode(&event.payload)?.selection {
            Some(Selection::Item(value)) => Some(value),
            _ => None,
        })
    }

    fn resolve(
        &self,
        event: &InteractionEvent,
        state: &CarouselState,
        value: String,
    ) -> Outcome<String> {
        let label = state
            .message_label
            .as_deref()
            .unwrap_or(self.config.label.as_str());
        let text = fill_named(
            &self.selected_value_template,
            &[("label", label), ("selected_val", value.as_str())],
        );

        let mut payload = event.payload.clone();
        CarouselState::clear(&mut payload);
        payload.remove(HOST_MESSAGE_ID_KEY);

        tracing::info!(widget = "carousel", selected = %value, "carousel item selected");

        Outcome::Resolved {
            value,
            confirmation: Frame {
                text,
                markup: Markup::new(),
                payload,
            },
        }
    }

    fn arrow_visibility(&self, start: usize) -> (bool, bool) {
        let len = self.config.content.len();
        let count = self.config.displayed_count;

        if len <= count {
            (false, false)
        } else if self.config.looping {
            (true, true)
        } else {
            (start > 0, start + count < len)
        }
    }

    fn window(&self, start: usize) -> Vec<&ContentItem> {
        let count = self.config.displayed_count;
        if self.config.looping {
            self.config.content.iter().cycle().skip(start).take(count).collect()
        } else {
            self.config.content.iter().skip(start).take(count).collect()
        }
    }

    fn left_arrow_label(&self, start: usize) -> String {
        if !self.config.show_numbers {
            return self.left_label.clone();
        }
        let start = start as i64;
        let count = self.config.displayed_count as i64;
        fill_positional(
            &self.left_label,
            &[(start - count + 1).to_string(), start.to_string()],
        )
    }

    fn right_arrow_label(&self, start: usize) -> String {
        if !self.config.show_numbers {
            return self.right_label.clone();
        }
        let end = start + self.config.displayed_count;
        let right_bound = (end + self.config.displayed_count).min(self.config.content.len());
        fill_positional(
            &self.right_label,
            &[(end + 1).to_string(), right_bound.to_string()],
        )
    }

    fn item_control(&self, base: &Payload, value: &str) -> Control {
        Control::new(
            value,
            self.context.command.as_str(),
            base.clone().with(SELECTED_VALUE_KEY, value),
        )
    }

    fn inline_markup(
        &self,
        base: &Payload,
        window: &[&ContentItem],
        left: Option<Control>,
        right: Option<Control>,
    ) -> Markup {
        let row = left
            .into_iter()
            .chain(
                window
                    .iter()
                    .copied()
                    .flat_map(|item| item.values())
                    .map(|value| self.item_control(base, value)),
            )
            .chain(right)
            .collect::<Vec<_>>();

        let mut markup = Markup::new();
        if !row.is_empty() {
            markup.push_row(row);
        }
        markup
    }

    fn newline_markup(
        &self,
        base: &Payload,
        window: &[&ContentItem],
        left: Option<Control>,
        right: Option<Control>,
    ) -> Markup {
        let mut markup = Markup::new();
        for item in window {
            markup.push_row(item.values().map(|value| self.item_control(base, value)).collect());
        }

        let left_shown = left.is_some();
        if let Some(left) = left {
            markup.add_control(left);
        }
        if let Some(right) = right {
            if left_shown {
                markup.add_inline_control(right);
            } else {
                markup.add_control(right);
            }
        }
        markup
    }
}

/// Toroidal wrap of a cursor that left `[0, len]`.
pub fn wrap_offset(offset: i64, len: usize) -> usize {
    let len_signed = len as i64;
    if (0..=len_signed).contains(&offset) {
        return offset as usize;
    }
    let wrapped = (i128::from(len_signed) - i128::from(offset.unsigned_abs())).unsigned_abs();
    // Only reachable with a tampered cursor; a window step never exceeds `len`.
    usize::try_from(wrapped).map_or(len, |wrapped| wrapped.min(len))
}
