//! # Rose Core
//!
//! Platform boundary for the Rose group-management bot.
//!
//! The messaging platform itself is an external collaborator.  This crate
//! describes exactly the surface the rest of the workspace consumes:
//!
//! - Identifier and metadata types ([`ChatId`], [`UserId`], [`Chat`], [`User`])
//! - Incoming [`Update`]s (messages, callback-button presses, chat migrations)
//! - Inline keyboards attached to outgoing messages
//! - The [`Bot`] trait providing send/edit/answer and moderation primitives
//!
//! Enable the `testing` feature for [`testing::RecordingBot`], an in-memory
//! bot that records every outgoing call.

pub mod bot;
pub mod error;
pub mod event;
pub mod keyboard;
pub mod types;

#[cfg(feature = "testing")]
pub mod testing;

pub use bot::{Bot, BoxedBot};
pub use error::{ApiError, ApiResult};
pub use event::{CallbackQuery, ChatMigration, Message, Update};
pub use keyboard::{ButtonAction, InlineButton, InlineKeyboard};
pub use types::{Chat, ChatId, ChatKind, MessageId, MessageRef, User, UserId};
