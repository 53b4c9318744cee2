//! Incoming platform updates.
//!
//! The platform delivers three kinds of updates the bot reacts to:
//!
//! ```text
//! Update
//! ├── Message        (text message, possibly a reply)
//! ├── CallbackQuery  (inline button press)
//! └── ChatMigration  (group id changed, e.g. upgraded to a supergroup)
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Chat, ChatId, MessageId, MessageRef, User};

/// A text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reply_to: Option<Box<Message>>,
}

impl Message {
    /// Creates a plain text message.
    pub fn new(id: i64, chat: Chat, from: User, text: impl Into<String>) -> Self {
        Self {
            id: MessageId(id),
            chat,
            from: Some(from),
            text: Some(text.into()),
            reply_to: None,
        }
    }

    /// Marks this message as a reply to `original`.
    pub fn replying_to(mut self, original: Message) -> Self {
        self.reply_to = Some(Box::new(original));
        self
    }

    /// Text content, or `""` for non-text messages.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Reference usable with [`Bot::edit_message`](crate::Bot::edit_message).
    pub fn msg_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat.id,
            message_id: self.id,
        }
    }
}

/// A press on an inline keyboard button carrying callback data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// The message the keyboard was attached to, when still accessible.
    #[serde(default)]
    pub message: Option<MessageRef>,
    #[serde(default)]
    pub chat: Option<Chat>,
    pub data: String,
}

/// Notice that a chat's identifier changed.
///
/// The platform reports a migration twice: once in the old chat carrying
/// `migrate_to`, once in the new chat carrying `migrate_from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMigration {
    pub chat: Chat,
    #[serde(default)]
    pub migrate_to: Option<ChatId>,
    #[serde(default)]
    pub migrate_from: Option<ChatId>,
}

impl ChatMigration {
    /// Resolves the `(old, new)` pair, or `None` when neither side is set.
    pub fn resolve(&self) -> Option<(ChatId, ChatId)> {
        if let Some(to) = self.migrate_to {
            Some((self.chat.id, to))
        } else {
            self.migrate_from.map(|from| (from, self.chat.id))
        }
    }
}

/// An update delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    Message(Message),
    CallbackQuery(CallbackQuery),
    ChatMigration(ChatMigration),
}

impl Update {
    /// Short name used in logs and spans.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::CallbackQuery(_) => "callback_query",
            Self::ChatMigration(_) => "chat_migration",
        }
    }

    /// The chat the update happened in, if known.
    pub fn chat(&self) -> Option<&Chat> {
        match self {
            Self::Message(m) => Some(&m.chat),
            Self::CallbackQuery(q) => q.chat.as_ref(),
            Self::ChatMigration(m) => Some(&m.chat),
        }
    }

    /// The user who caused the update, if any.
    pub fn sender(&self) -> Option<&User> {
        match self {
            Self::Message(m) => m.from.as_ref(),
            Self::CallbackQuery(q) => Some(&q.from),
            Self::ChatMigration(_) => None,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        match self {
            Self::CallbackQuery(q) => Some(q),
            _ => None,
        }
    }

    pub fn migration(&self) -> Option<&ChatMigration> {
        match self {
            Self::ChatMigration(m) => Some(m),
            _ => None,
        }
    }
}
