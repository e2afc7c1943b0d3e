//! Validation messages
//!
//! Messages are the non-fatal outcome of a failing rule. Two messages are equal when
//! their text is equal, whatever their kind; the state container relies on this to
//! de-duplicate.

use std::fmt;

use serde_derive::{Deserialize, Serialize};

/// Error vs. warning classification of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Error,
    Warning,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Error => f.write_str("error"),
            MessageKind::Warning => f.write_str("warning"),
        }
    }
}

/// Human-readable failure text tagged with its kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ValidationMessage {
    Error(String),
    Warning(String),
}

impl ValidationMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        match kind {
            MessageKind::Error => ValidationMessage::Error(text.into()),
            MessageKind::Warning => ValidationMessage::Warning(text.into()),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ValidationMessage::Error(text.into())
    }

    pub fn warning(text: impl Into<String>) -> Self {
        ValidationMessage::Warning(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            ValidationMessage::Error(text) | ValidationMessage::Warning(text) => text,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            ValidationMessage::Error(_) => MessageKind::Error,
            ValidationMessage::Warning(_) => MessageKind::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind() == MessageKind::Error
    }

    pub fn is_warning(&self) -> bool {
        self.kind() == MessageKind::Warning
    }
}

impl PartialEq for ValidationMessage {
    fn eq(&self, other: &Self) -> bool {
        self.text() == other.text()
    }
}

impl Eq for ValidationMessage {}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Text of the first message, or an empty string when there is none.
///
/// This is what a single-line error label shows for a field.
pub fn first_message_text(messages: &[ValidationMessage]) -> &str {
    messages.first().map(ValidationMessage::text).unwrap_or_default()
}
