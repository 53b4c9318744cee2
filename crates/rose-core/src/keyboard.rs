//! Inline keyboards attached to outgoing messages.

use serde::{Deserialize, Serialize};

/// What pressing a button does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Delivers a [`CallbackQuery`](crate::CallbackQuery) with this payload.
    Callback(String),
    /// Opens a URL (typically a `t.me` deep link).
    Url(String),
}

/// A single inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub action: ButtonAction,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    /// Callback payload, if this is a callback button.
    pub fn callback_data(&self) -> Option<&str> {
        match &self.action {
            ButtonAction::Callback(data) => Some(data),
            ButtonAction::Url(_) => None,
        }
    }
}

/// A grid of buttons, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row (builder pattern).  Empty rows are dropped.
    pub fn row(mut self, row: Vec<InlineButton>) -> Self {
        self.push_row(row);
        self
    }

    /// Appends a row.  Empty rows are dropped.
    pub fn push_row(&mut self, row: Vec<InlineButton>) {
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    pub fn rows(&self) -> &[Vec<InlineButton>] {
        &self.rows
    }

    /// All buttons in reading order.
    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }

    /// Finds a button by its label.
    pub fn find(&self, text: &str) -> Option<&InlineButton> {
        self.buttons().find(|b| b.text == text)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rows_are_dropped() {
        let kb = InlineKeyboard::new()
            .row(vec![])
            .row(vec![InlineButton::callback("A", "a")]);
        assert_eq!(kb.rows().len(), 1);
        assert_eq!(kb.find("A").and_then(|b| b.callback_data()), Some("a"));
    }
}
