//! Identifier and metadata types shared by every layer.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Platform identifier of a chat (negative for groups).
    ChatId
);
id_type!(
    /// Platform identifier of a user.
    UserId
);
id_type!(
    /// Identifier of a message, unique within its chat.
    MessageId
);

/// Reference to a message the bot can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Kind of chat an update was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// Chat metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    /// A private (one-to-one) chat with `user`.
    pub fn private(user: UserId) -> Self {
        Self {
            id: ChatId(user.0),
            kind: ChatKind::Private,
            title: None,
        }
    }

    /// A supergroup with the given id and title.
    pub fn group(id: ChatId, title: impl Into<String>) -> Self {
        Self {
            id,
            kind: ChatKind::Supergroup,
            title: Some(title.into()),
        }
    }

    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }

    /// Returns `true` for both basic groups and supergroups.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group | ChatKind::Supergroup)
    }

    /// Title for display, falling back to the numeric id.
    pub fn display_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// User metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl User {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            username: None,
            is_bot: false,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_id_parses_negative_ids() {
        let id: ChatId = "-100111".parse().unwrap();
        assert_eq!(id, ChatId(-100111));
        assert_eq!(id.to_string(), "-100111");
    }

    #[test]
    fn test_chat_kind_helpers() {
        assert!(Chat::private(UserId(7)).is_private());
        assert!(Chat::group(ChatId(-1), "g").is_group());
        assert_eq!(Chat::private(UserId(7)).display_title(), "7");
    }
}
