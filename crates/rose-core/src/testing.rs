//! In-memory [`Bot`] that records every outgoing call.
//!
//! ```rust,ignore
//! let bot = RecordingBot::new("rose_bot");
//! bot.set_admin(ChatId(-1), UserId(7));
//! runtime.handle_update(bot.clone(), update).await;
//! assert_eq!(bot.sent_texts(), vec!["Warned!"]);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::bot::Bot;
use crate::error::{ApiError, ApiResult};
use crate::keyboard::InlineKeyboard;
use crate::types::{Chat, ChatId, MessageId, MessageRef, UserId};

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Sent {
        chat: ChatId,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    Edited {
        message: MessageRef,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    Answered {
        query_id: String,
        text: Option<String>,
    },
    Banned {
        chat: ChatId,
        user: UserId,
    },
    Unbanned {
        chat: ChatId,
        user: UserId,
    },
}

impl Outgoing {
    /// Text of a sent or edited message.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Sent { text, .. } | Self::Edited { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Keyboard of a sent or edited message.
    pub fn keyboard(&self) -> Option<&InlineKeyboard> {
        match self {
            Self::Sent { keyboard, .. } | Self::Edited { keyboard, .. } => keyboard.as_ref(),
            _ => None,
        }
    }
}

#[derive(Default)]
struct State {
    log: Vec<Outgoing>,
    admins: HashSet<(ChatId, UserId)>,
    chats: HashMap<ChatId, Chat>,
    unreachable: HashSet<ChatId>,
}

/// A bot that never talks to a network.
pub struct RecordingBot {
    id: UserId,
    username: String,
    next_message: AtomicI64,
    state: Mutex<State>,
}

impl RecordingBot {
    pub fn new(username: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: UserId(1),
            username: username.into(),
            next_message: AtomicI64::new(1),
            state: Mutex::new(State::default()),
        })
    }

    /// Makes `user` an administrator of `chat`.
    pub fn set_admin(&self, chat: ChatId, user: UserId) {
        self.state.lock().admins.insert((chat, user));
    }

    /// Registers chat metadata returned by [`Bot::get_chat`].
    pub fn add_chat(&self, chat: Chat) {
        self.state.lock().chats.insert(chat.id, chat);
    }

    /// Makes every send to `chat` fail with [`ApiError::Forbidden`].
    pub fn set_unreachable(&self, chat: ChatId) {
        self.state.lock().unreachable.insert(chat);
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<Outgoing> {
        self.state.lock().log.clone()
    }

    /// Texts of sent and edited messages, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|o| o.text().map(str::to_string))
            .collect()
    }

    /// The most recent sent or edited message.
    pub fn last_text(&self) -> Option<Outgoing> {
        self.state
            .lock()
            .log
            .iter()
            .rev()
            .find(|o| o.text().is_some())
            .cloned()
    }

    pub fn clear(&self) {
        self.state.lock().log.clear();
    }
}

#[async_trait]
impl Bot for RecordingBot {
    fn id(&self) -> UserId {
        self.id
    }

    fn username(&self) -> &str {
        &self.username
    }

    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> ApiResult<MessageRef> {
        let mut state = self.state.lock();
        if state.unreachable.contains(&chat) {
            return Err(ApiError::Forbidden(format!("cannot message {chat}")));
        }
        state.log.push(Outgoing::Sent {
            chat,
            text: text.to_string(),
            keyboard,
        });
        Ok(MessageRef {
            chat_id: chat,
            message_id: MessageId(self.next_message.fetch_add(1, Ordering::SeqCst)),
        })
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> ApiResult<()> {
        self.state.lock().log.push(Outgoing::Edited {
            message,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, text: Option<&str>) -> ApiResult<()> {
        self.state.lock().log.push(Outgoing::Answered {
            query_id: query_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }

    async fn get_chat(&self, chat: ChatId) -> ApiResult<Chat> {
        self.state
            .lock()
            .chats
            .get(&chat)
            .cloned()
            .ok_or(ApiError::ChatNotFound(chat))
    }

    async fn is_chat_admin(&self, chat: ChatId, user: UserId) -> ApiResult<bool> {
        Ok(self.state.lock().admins.contains(&(chat, user)))
    }

    async fn ban_member(&self, chat: ChatId, user: UserId) -> ApiResult<()> {
        self.state.lock().log.push(Outgoing::Banned { chat, user });
        Ok(())
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> ApiResult<()> {
        self.state.lock().log.push(Outgoing::Unbanned { chat, user });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let bot = RecordingBot::new("rose_bot");
        bot.send_message(ChatId(5), "hi", None).await.unwrap();
        bot.answer_callback("q1", None).await.unwrap();
        bot.ban_member(ChatId(5), UserId(9)).await.unwrap();

        let calls = bot.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].text(), Some("hi"));
        assert_eq!(
            calls[2],
            Outgoing::Banned {
                chat: ChatId(5),
                user: UserId(9)
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_chat_is_forbidden() {
        let bot = RecordingBot::new("rose_bot");
        bot.set_unreachable(ChatId(5));
        let err = bot.send_message(ChatId(5), "hi", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(bot.calls().is_empty());
    }
}
