//! Per-update context handed to matchers and handlers.
//!
//! One [`UpdateContext`] is created per incoming update and shared (via `Arc`)
//! by every matcher that sees it.  Calling
//! [`stop_propagation`](UpdateContext::stop_propagation) from any handler is
//! immediately visible to the dispatch loop, which then skips every remaining
//! handler and matcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rose_core::{
    ApiError, ApiResult, BoxedBot, CallbackQuery, Chat, ChatId, ChatMigration, InlineKeyboard,
    Message, MessageRef, Update, User, UserId,
};

use crate::command::{Command, CommandParser};

pub struct UpdateContext {
    update: Update,
    bot: BoxedBot,
    command: Option<Command>,
    /// Cleared by [`stop_propagation`](Self::stop_propagation).
    is_propagating: AtomicBool,
}

impl UpdateContext {
    /// Creates a context, parsing the message text as a command if it is one.
    pub fn new(update: Update, bot: BoxedBot, parser: &CommandParser) -> Self {
        let command = update
            .message()
            .and_then(|m| m.text.as_deref())
            .and_then(|text| parser.parse(text, bot.username()));
        Self {
            update,
            bot,
            command,
            is_propagating: AtomicBool::new(true),
        }
    }

    // ─── Update access ────────────────────────────────────────────────────────

    pub fn update(&self) -> &Update {
        &self.update
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    pub fn bot_arc(&self) -> BoxedBot {
        Arc::clone(&self.bot)
    }

    pub fn message(&self) -> Option<&Message> {
        self.update.message()
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        self.update.callback_query()
    }

    pub fn migration(&self) -> Option<&ChatMigration> {
        self.update.migration()
    }

    pub fn chat(&self) -> Option<&Chat> {
        self.update.chat()
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.chat().map(|c| c.id)
    }

    pub fn sender(&self) -> Option<&User> {
        self.update.sender()
    }

    pub fn sender_id(&self) -> Option<UserId> {
        self.sender().map(|u| u.id)
    }

    pub fn is_private(&self) -> bool {
        self.chat().is_some_and(Chat::is_private)
    }

    pub fn is_group(&self) -> bool {
        self.chat().is_some_and(Chat::is_group)
    }

    /// The message being replied to, if this is a reply.
    pub fn replied(&self) -> Option<&Message> {
        self.message()?.reply_to.as_deref()
    }

    // ─── Command access ───────────────────────────────────────────────────────

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    /// Whitespace-separated command arguments (empty for non-commands).
    pub fn args(&self) -> Vec<&str> {
        self.command.as_ref().map(Command::args).unwrap_or_default()
    }

    /// Raw argument text after the command (empty for non-commands).
    pub fn arg_text(&self) -> &str {
        self.command.as_ref().map_or("", |c| c.raw_args.as_str())
    }

    /// Callback data of a button press (empty for other updates).
    pub fn callback_data(&self) -> &str {
        self.callback_query().map_or("", |q| q.data.as_str())
    }

    // ─── Propagation ──────────────────────────────────────────────────────────

    pub fn is_propagating(&self) -> bool {
        self.is_propagating.load(Ordering::SeqCst)
    }

    /// Stops every remaining handler and matcher from seeing this update.
    pub fn stop_propagation(&self) {
        self.is_propagating.store(false, Ordering::SeqCst);
    }

    // ─── Replies ──────────────────────────────────────────────────────────────

    fn reply_chat(&self) -> ApiResult<ChatId> {
        self.chat_id()
            .ok_or_else(|| ApiError::BadRequest(format!("{} has no chat", self.update.kind())))
    }

    /// Sends `text` to the chat the update came from.
    pub async fn reply(&self, text: &str) -> ApiResult<MessageRef> {
        self.bot.send_message(self.reply_chat()?, text, None).await
    }

    pub async fn reply_with(&self, text: &str, keyboard: InlineKeyboard) -> ApiResult<MessageRef> {
        self.bot
            .send_message(self.reply_chat()?, text, Some(keyboard))
            .await
    }

    /// Sends a message to the sender's private chat.
    pub async fn send_private(
        &self,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> ApiResult<MessageRef> {
        let user = self
            .sender_id()
            .ok_or_else(|| ApiError::BadRequest("update has no sender".into()))?;
        self.bot.send_message(ChatId(user.0), text, keyboard).await
    }

    /// Edits the message a pressed button belongs to, or replies when the
    /// update is not a button press on an accessible message.
    pub async fn edit_or_reply(&self, text: &str, keyboard: Option<InlineKeyboard>) -> ApiResult<()> {
        match self.callback_query().and_then(|q| q.message) {
            Some(message) => self.bot.edit_message(message, text, keyboard).await,
            None => {
                let chat = self.reply_chat()?;
                self.bot.send_message(chat, text, keyboard).await.map(|_| ())
            }
        }
    }

    /// Answers the pending callback query (no-op for other updates).
    pub async fn answer(&self, text: Option<&str>) -> ApiResult<()> {
        match self.callback_query() {
            Some(q) => self.bot.answer_callback(&q.id, text).await,
            None => Ok(()),
        }
    }

    /// Whether the sender administers the current chat.
    ///
    /// Always `true` in private chats.
    pub async fn sender_is_admin(&self) -> ApiResult<bool> {
        let (Some(chat), Some(user)) = (self.chat(), self.sender_id()) else {
            return Ok(false);
        };
        if chat.is_private() {
            return Ok(true);
        }
        self.bot.is_chat_admin(chat.id, user).await
    }
}

impl std::fmt::Debug for UpdateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateContext")
            .field("update", &self.update.kind())
            .field("command", &self.command)
            .field("is_propagating", &self.is_propagating())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rose_core::testing::RecordingBot;

    fn ctx(text: &str) -> UpdateContext {
        let user = User::new(UserId(7), "Alice");
        let msg = Message::new(10, Chat::private(UserId(7)), user, text);
        UpdateContext::new(
            Update::Message(msg),
            RecordingBot::new("rose_bot"),
            &CommandParser::default(),
        )
    }

    #[test]
    fn test_command_is_parsed_once() {
        let ctx = ctx("/setrules be   nice");
        assert_eq!(ctx.command().map(|c| c.name.as_str()), Some("setrules"));
        assert_eq!(ctx.arg_text(), "be   nice");
        assert_eq!(ctx.args(), ["be", "nice"]);
    }

    #[test]
    fn test_plain_text_has_no_command() {
        let ctx = ctx("hello");
        assert!(ctx.command().is_none());
        assert_eq!(ctx.arg_text(), "");
    }

    #[test]
    fn test_stop_propagation() {
        let ctx = ctx("hi");
        assert!(ctx.is_propagating());
        ctx.stop_propagation();
        assert!(!ctx.is_propagating());
    }

    #[tokio::test]
    async fn test_private_sender_counts_as_admin() {
        assert!(ctx("/x").sender_is_admin().await.unwrap());
    }
}
