//! Form-like table: one row per field, a checkbox label on the left and the field's
//! current value on the right. Each value control routes to its own command.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use snafu::ensure;

use super::{Frame, WidgetContext};
use crate::error::{UnmappedValueSnafu, WidgetResult};
use crate::markup::{Control, Markup};
use crate::payload::Payload;
use crate::reconciler::Reconciler;
use crate::settings::ChecktableStrings;
use crate::types::{Delivery, InteractionEvent};

/// A field value that may be explicitly unset, as opposed to absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Held<T> {
    #[default]
    Unset,
    Value(T),
}

impl<T> Held<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Held::Unset)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Held::Unset => None,
            Held::Value(value) => Some(value),
        }
    }
}

impl<T> From<T> for Held<T> {
    fn from(value: T) -> Self {
        Held::Value(value)
    }
}

#[derive(Debug, Clone)]
pub struct CheckboxContent<T> {
    pub label: String,
    /// Routed when the value control is clicked.
    pub command: String,
    /// `None` renders the empty placeholder.
    pub value: Option<Held<T>>,
    /// Display text per value. Empty means no mapping.
    pub mapping: HashMap<T, String>,
    /// Carried by both controls of the row.
    pub data: Payload,
}

impl<T: Eq + Hash> PartialEq for CheckboxContent<T> {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
            && self.command == other.command
            && self.value == other.value
            && self.mapping == other.mapping
            && self.data == other.data
    }
}

impl<T> CheckboxContent<T>
where
    T: Eq + Hash + Display,
{
    /// A field that starts out unset.
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            value: Some(Held::Unset),
            mapping: HashMap::new(),
            data: Payload::new(),
        }
    }

    /// Fails when a non-empty mapping has no entry for `value`.
    pub fn with_value(self, value: T) -> WidgetResult<Self> {
        self.with_held(Held::Value(value))
    }

    pub fn with_held(mut self, held: Held<T>) -> WidgetResult<Self> {
        self.value = Some(held);
        self.validate()?;
        Ok(self)
    }

    pub fn without_value(mut self) -> Self {
        self.value = None;
        self
    }

    /// Fails when a value is already held and the new mapping does not cover it.
    pub fn with_mapping<S: Into<String>>(
        mut self,
        mapping: impl IntoIterator<Item = (T, S)>,
    ) -> WidgetResult<Self> {
        self.mapping = mapping
            .into_iter()
            .map(|(value, text)| (value, text.into()))
            .collect();
        self.validate()?;
        Ok(self)
    }

    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    pub fn is_checked(&self) -> bool {
        !matches!(self.value, Some(Held::Unset))
    }

    /// A held value must be a key of a non-empty mapping. [`Checktable::new`] checks
    /// again, since the fields are public.
    pub fn validate(&self) -> WidgetResult<()> {
        if let Some(Held::Value(value)) = &self.value {
            ensure!(
                self.mapping.is_empty() || self.mapping.contains_key(value),
                UnmappedValueSnafu {
                    stage: "checkbox-validate",
                    label: self.label.clone(),
                    value: value.to_string(),
                }
            );
        }
        Ok(())
    }

    fn value_text(&self, strings: &ChecktableStrings) -> String {
        let mapped = !self.mapping.is_empty();
        match &self.value {
            None => strings.empty.clone(),
            Some(Held::Unset) if mapped => strings.choose.clone(),
            Some(Held::Unset) => strings.fill.clone(),
            Some(Held::Value(value)) => self
                .mapping
                .get(value)
                .cloned()
                .unwrap_or_else(|| value.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Checktable<T> {
    context: WidgetContext,
    checkboxes: Vec<CheckboxContent<T>>,
    label: String,
    uncheck_command: String,
    strings: ChecktableStrings,
}

impl<T> Checktable<T>
where
    T: Eq + Hash + Display,
{
    pub fn new(
        context: WidgetContext,
        checkboxes: Vec<CheckboxContent<T>>,
        label: impl Into<String>,
        uncheck_command: impl Into<String>,
        strings: ChecktableStrings,
    ) -> WidgetResult<Self> {
        for checkbox in &checkboxes {
            checkbox.validate()?;
        }

        Ok(Self {
            context,
            checkboxes,
            label: label.into(),
            uncheck_command: uncheck_command.into(),
            strings,
        })
    }

    pub fn render(&self, event: &InteractionEvent) -> Frame {
        let mut markup = Markup::new();

        for checkbox in &self.checkboxes {
            let mut data = checkbox.data.clone();
            data.mark_widget();

            let glyph = if checkbox.is_checked() {
                &self.strings.checked
            } else {
                &self.strings.unchecked
            };
            markup.push_row(vec![
                Control::new(
                    format!("{glyph} {}", checkbox.label),
                    self.uncheck_command.as_str(),
                    data.clone(),
                ),
                Control::new(
                    checkbox.value_text(&self.strings),
                    checkbox.command.as_str(),
                    data,
                ),
            ]);
        }

        tracing::debug!(
            widget = "checktable",
            fields = self.checkboxes.len(),
            checked = self.checkboxes.iter().filter(|checkbox| checkbox.is_checked()).count(),
            "rendered checktable"
        );

        Frame {
            text: self.label.clone(),
            markup: self.context.attach_extra(markup),
            payload: self.context.base_payload(&event.payload),
        }
    }

    pub async fn display(
        &self,
        event: &InteractionEvent,
        reconciler: &Reconciler,
    ) -> WidgetResult<Delivery> {
        reconciler
            .send_or_update(event, self.render(event).into_content())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WidgetError;
    use crate::ids::ChatId;

    fn table(checkboxes: Vec<CheckboxContent<i64>>) -> Checktable<i64> {
        Checktable::new(
            WidgetContext::new("/form"),
            checkboxes,
            "Order",
            "/uncheck",
            ChecktableStrings::default(),
        )
        .expect("valid checktable")
    }

    fn render(table: &Checktable<i64>) -> Frame {
        table.render(&InteractionEvent::new(ChatId::new_v7(), "/form"))
    }

    fn quantity() -> CheckboxContent<i64> {
        CheckboxContent::new("Quantity", "/quantity")
            .with_mapping([(1, "One"), (2, "Two")])
            .expect("valid mapping")
    }

    #[test]
    fn mapped_field_shows_choose_then_the_mapped_text() {
        let unset = render(&table(vec![quantity()]));
        assert_eq!(unset.markup.labels(), vec![vec!["☐ Quantity", "Choose"]]);

        let chosen = render(&table(vec![quantity().with_value(1).expect("mapped")]));
        assert_eq!(chosen.markup.labels(), vec![vec!["☑ Quantity", "One"]]);
    }

    #[test]
    fn value_text_covers_every_field_shape() {
        let frame = render(&table(vec![
            CheckboxContent::new("Comment", "/comment").without_value(),
            CheckboxContent::new("Floor", "/floor"),
            CheckboxContent::new("Table", "/table").with_value(12).expect("unmapped field"),
        ]));

        assert_eq!(
            frame.markup.labels(),
            vec![
                vec!["☑ Comment", "[Empty]"],
                vec!["☐ Floor", "Fill"],
                vec!["☑ Table", "12"],
            ]
        );
    }

    #[test]
    fn empty_mapping_counts_as_no_mapping() {
        let field = CheckboxContent::new("Floor", "/floor")
            .with_mapping(Vec::<(i64, String)>::new())
            .and_then(|field| field.with_value(3))
            .expect("empty mapping accepts any value");
        assert_eq!(render(&table(vec![field])).markup.labels(), vec![vec!["☑ Floor", "3"]]);
    }

    #[test]
    fn both_controls_carry_field_data_and_their_own_commands() {
        let field = quantity().with_data(Payload::new().with("field", "quantity"));
        let frame = render(&table(vec![field]));
        let row = &frame.markup.rows()[0];

        assert_eq!(row[0].command, "/uncheck");
        assert_eq!(row[1].command, "/quantity");
        for control in row {
            assert_eq!(
                control.payload.get("field").and_then(|value| value.as_str()),
                Some("quantity")
            );
            assert!(control.payload.is_widget_round());
        }
    }

    #[test]
    fn value_outside_mapping_fails_construction() {
        let unmapped = |result: WidgetResult<CheckboxContent<i64>>| {
            matches!(
                result,
                Err(WidgetError::UnmappedValue { ref label, ref value, .. })
                    if label == "Quantity" && value == "3"
            )
        };

        assert!(unmapped(quantity().with_value(3)));
        assert!(unmapped(
            CheckboxContent::new("Quantity", "/quantity")
                .with_value(3)
                .and_then(|field| field.with_mapping([(1, "One")]))
        ));

        let mut tampered = quantity();
        tampered.value = Some(Held::Value(3));
        let result = Checktable::new(
            WidgetContext::new("/form"),
            vec![tampered],
            "Order",
            "/uncheck",
            ChecktableStrings::default(),
        );
        assert!(matches!(result, Err(WidgetError::UnmappedValue { .. })));
    }

    #[test]
    fn unset_is_structural() {
        assert_eq!(Held::<i64>::Unset, Held::default());
        assert_ne!(Held::Value(0), Held::Unset);
        assert_eq!(Held::from(5).as_value(), Some(&5));
    }
}
