//! The `Bot` trait: everything the bot can ask of the platform.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::keyboard::InlineKeyboard;
use crate::types::{Chat, ChatId, MessageRef, UserId};

/// Outgoing side of the platform SDK.
///
/// Implementations wrap a concrete messaging API.  Every method is a single
/// round trip; retries and rate limiting are the implementation's concern.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// The bot's own user id.
    fn id(&self) -> UserId;

    /// The bot's username, without the leading `@`.
    fn username(&self) -> &str;

    /// Sends a message, optionally with an inline keyboard.
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> ApiResult<MessageRef>;

    /// Replaces the text (and keyboard) of a message previously sent by the bot.
    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> ApiResult<()>;

    /// Acknowledges a callback query, optionally showing a toast.
    async fn answer_callback(&self, query_id: &str, text: Option<&str>) -> ApiResult<()>;

    /// Fetches chat metadata.
    async fn get_chat(&self, chat: ChatId) -> ApiResult<Chat>;

    /// Returns whether `user` administers `chat`.
    async fn is_chat_admin(&self, chat: ChatId, user: UserId) -> ApiResult<bool>;

    /// Bans `user` from `chat`.
    async fn ban_member(&self, chat: ChatId, user: UserId) -> ApiResult<()>;

    /// Lifts a ban.  Unbanning a present member removes them (a kick).
    async fn unban_member(&self, chat: ChatId, user: UserId) -> ApiResult<()>;
}

/// A shared bot handle.
pub type BoxedBot = Arc<dyn Bot>;
