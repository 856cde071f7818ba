//! Multi-select list. Every click flips one item; there is no terminal round.

use serde_json::Value;

use super::{Frame, WidgetContext};
use crate::error::WidgetResult;
use crate::markup::{Control, Markup};
use crate::payload::{Payload, StateCodec};
use crate::reconciler::Reconciler;
use crate::settings::ChecklistStrings;
use crate::types::{ContentItem, InteractionEvent};

pub const SELECTED_ITEM_KEY: &str = "checklist_selected_item";
pub const CHECKED_ITEMS_KEY: &str = "checklist_checked_items";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecklistState {
    /// Item clicked in this round.
    pub selected_item: Option<String>,
    /// In the order items were checked.
    pub checked_items: Vec<String>,
}

impl ChecklistState {
    /// Applies the pending click: removes the item if checked, appends it otherwise.
    pub fn apply_toggle(&mut self) -> Option<String> {
        let item = self.selected_item.take()?;
        match self.checked_items.iter().position(|checked| *checked == item) {
            Some(index) => {
                self.checked_items.remove(index);
            }
            None => self.checked_items.push(item.clone()),
        }
        Some(item)
    }

    pub fn is_checked(&self, item: &str) -> bool {
        self.checked_items.iter().any(|checked| checked == item)
    }
}

impl StateCodec for ChecklistState {
    const KEYS: &'static [&'static str] = &[SELECTED_ITEM_KEY, CHECKED_ITEMS_KEY];

    fn decode(payload: &Payload) -> WidgetResult<Self> {
        Ok(Self {
            selected_item: payload.text(SELECTED_ITEM_KEY, "checklist-decode-selected")?,
            checked_items: payload
                .text_list(CHECKED_ITEMS_KEY, "checklist-decode-checked")?
                .unwrap_or_default(),
        })
    }

    fn encode(&self, payload: &mut Payload) {
        if let Some(item) = &self.selected_item {
            payload.insert(SELECTED_ITEM_KEY, item.as_str());
        }
        payload.insert(
            CHECKED_ITEMS_KEY,
            Value::from(self.checked_items.clone()),
        );
    }
}

/// Result of one checklist round.
#[derive(Debug, Clone, PartialEq)]
pub struct ChecklistRender {
    /// The item this round toggled, if the event was a click.
    pub toggled: Option<String>,
    pub checked: Vec<String>,
    pub frame: Frame,
}

#[derive(Debug, Clone)]
pub struct Checklist {
    context: WidgetContext,
    content: Vec<ContentItem>,
    label: String,
    strings: ChecklistStrings,
}

impl Checklist {
    pub fn new(
        context: WidgetContext,
        content: impl IntoIterator<Item = ContentItem>,
        label: impl Into<String>,
        strings: ChecklistStrings,
    ) -> Self {
        Self {
            context,
            content: content.into_iter().collect(),
            label: label.into(),
            strings,
        }
    }

    pub fn render(&self, event: &InteractionEvent) -> WidgetResult<ChecklistRender> {
        let mut state = ChecklistState::decode(&event.payload)?;
        let toggled = state.apply_toggle();

        let mut base = self.context.base_payload(&event.payload);
        base.remove(SELECTED_ITEM_KEY);
        state.encode(&mut base);

        let mut markup = Markup::new();
        for item in &self.content {
            markup.push_row(
                item.values()
                    .map(|value| self.item_control(&base, &state, value))
                    .collect(),
            );
        }

        tracing::debug!(
            widget = "checklist",
            toggled = toggled.as_deref().unwrap_or_default(),
            checked = state.checked_items.len(),
            "rendered checklist"
        );

        Ok(ChecklistRender {
            toggled,
            checked: state.checked_items,
            frame: Frame {
                text: self.label.clone(),
                markup: self.context.attach_extra(markup),
                payload: base,
            },
        })
    }

    /// Shows the list and returns the item this round toggled.
    pub async fn display(
        &self,
        event: &InteractionEvent,
        reconciler: &Reconciler,
    ) -> WidgetResult<Option<String>> {
        let rendered = self.render(event)?;
        reconciler
            .send_or_update(event, rendered.frame.into_content())
            .await?;
        Ok(rendered.toggled)
    }

    /// Checked items as carried by `event`, before this round's toggle.
    pub fn checked_items(event: &InteractionEvent) -> WidgetResult<Vec<String>> {
        Ok(ChecklistState::decode(&event.payload)?.checked_items)
    }

    fn item_control(&self, base: &Payload, state: &ChecklistState, value: &str) -> Control {
        let glyph = if state.is_checked(value) {
            &self.strings.checked
        } else {
            &self.strings.unchecked
        };
        Control::new(
            format!("{glyph} {value}"),
            self.context.command.as_str(),
            base.clone().with(SELECTED_ITEM_KEY, value),
        )
    }
}
