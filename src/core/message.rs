//! Conversation turns.
//!
//! A [`Message`] is one displayed unit of conversation. Turns are immutable
//! once appended to the log and are only ever destroyed when the process
//! exits.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Model,
    Error,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Model => "model",
            Sender::Error => "error",
        }
    }

    pub fn is_user(self) -> bool {
        self == Sender::User
    }

    /// Whether content from this sender goes through the markdown renderer.
    /// User text is always displayed literally.
    pub fn renders_markup(self) -> bool {
        matches!(self, Sender::Model | Sender::Error)
    }
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Sender::Model, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Sender::Error, content)
    }
}
