use serde::{Deserialize, Serialize};

use super::payload::Payload;

/// One clickable element. An empty command makes the control inert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub label: String,
    pub command: String,
    #[serde(default)]
    pub payload: Payload,
}

impl Control {
    pub fn new(label: impl Into<String>, command: impl Into<String>, payload: Payload) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            payload,
        }
    }

    /// Decorative control that routes nowhere.
    pub fn inert(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: String::new(),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn is_inert(&self) -> bool {
        self.command.trim().is_empty()
    }
}

/// Rows of controls, rendered top-to-bottom and left-to-right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markup {
    rows: Vec<Vec<Control>>,
}

impl Markup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Vec<Control>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Appends a control on a new row.
    pub fn add_control(&mut self, control: Control) {
        self.rows.push(vec![control]);
    }

    /// Appends a control to the last row, opening one if the markup is empty.
    pub fn add_inline_control(&mut self, control: Control) {
        match self.rows.last_mut() {
            Some(row) => row.push(control),
            None => self.rows.push(vec![control]),
        }
    }

    pub fn push_row(&mut self, row: Vec<Control>) {
        self.rows.push(row);
    }

    /// Concatenates the rows of `other` after this markup's rows.
    pub fn merge(mut self, other: Markup) -> Markup {
        self.rows.extend(other.rows);
        self
    }

    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.rows.iter().flatten()
    }

    pub fn find_by_label(&self, label: &str) -> Option<&Control> {
        self.controls().find(|control| control.label == label)
    }

    pub fn labels(&self) -> Vec<Vec<&str>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|control| control.label.as_str()).collect())
            .collect()
    }
}

impl From<Vec<Vec<Control>>> for Markup {
    fn from(rows: Vec<Vec<Control>>) -> Self {
        Self { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markup_of(labels: &[&[&str]]) -> Markup {
        labels
            .iter()
            .map(|row| row.iter().map(|label| Control::new(*label, "/cmd", Payload::new())).collect())
            .collect::<Vec<Vec<Control>>>()
            .into()
    }

    #[test]
    fn inline_controls_extend_the_last_row() {
        let mut markup = Markup::new();
        markup.add_inline_control(Control::inert("a"));
        markup.add_inline_control(Control::inert("b"));
        markup.add_control(Control::inert("c"));
        markup.add_inline_control(Control::inert("d"));
        assert_eq!(markup.labels(), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn merge_is_associative_and_keeps_row_order() {
        let a = markup_of(&[&["1"], &["2", "3"]]);
        let b = markup_of(&[&["4"]]);
        let c = markup_of(&[&["5", "6"]]);

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));

        assert_eq!(left, right);
        assert_eq!(left.labels(), vec![vec!["1"], vec!["2", "3"], vec!["4"], vec!["5", "6"]]);
    }

    #[test]
    fn blank_command_is_inert() {
        assert!(Control::new(" ", "  ", Payload::new()).is_inert());
        assert!(!Control::new("go", "/go", Payload::new()).is_inert());
    }
}
