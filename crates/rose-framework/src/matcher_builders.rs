//! Matcher presets for common update shapes.
//!
//! # Example
//!
//! ```rust,ignore
//! use rose_framework::{on_callback, on_command, on_message};
//!
//! module
//!     .matcher(on_command("warn").group_only().handler(warn))
//!     .matcher(on_callback("rm_warn_").handler(remove_warn))
//!     .matcher(on_message().group(4).handler(log_user));
//! ```

use crate::matcher::Matcher;

/// Matches a command by name (case-insensitive).
pub fn on_command(name: &str) -> Matcher {
    let name = name.to_lowercase();
    Matcher::new()
        .name(format!("command:{name}"))
        .check(move |ctx| ctx.command().is_some_and(|c| c.name == name))
}

/// Matches any of several command aliases.
pub fn on_commands(names: &[&str]) -> Matcher {
    let names: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    Matcher::new()
        .name(format!("command:{}", names.join("|")))
        .check(move |ctx| {
            ctx.command()
                .is_some_and(|c| names.iter().any(|n| *n == c.name))
        })
}

/// Matches button presses whose callback data starts with `prefix`.
pub fn on_callback(prefix: &str) -> Matcher {
    let prefix = prefix.to_string();
    Matcher::new()
        .name(format!("callback:{prefix}"))
        .check(move |ctx| {
            ctx.callback_query()
                .is_some_and(|q| q.data.starts_with(&prefix))
        })
}

/// Matches chat-migration notices that carry an old/new id pair.
pub fn on_migration() -> Matcher {
    Matcher::new()
        .name("migration")
        .check(|ctx| ctx.migration().is_some_and(|m| m.resolve().is_some()))
}

/// Matches every message.
pub fn on_message() -> Matcher {
    Matcher::new()
        .name("message")
        .check(|ctx| ctx.message().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandParser;
    use crate::context::UpdateContext;
    use rose_core::testing::RecordingBot;
    use rose_core::{CallbackQuery, Chat, ChatId, ChatMigration, Message, Update, User, UserId};

    fn make(update: Update) -> UpdateContext {
        UpdateContext::new(update, RecordingBot::new("rose_bot"), &CommandParser::default())
    }

    fn text(t: &str) -> UpdateContext {
        make(Update::Message(Message::new(
            1,
            Chat::private(UserId(7)),
            User::new(UserId(7), "Alice"),
            t,
        )))
    }

    #[test]
    fn test_on_command_is_case_insensitive() {
        assert!(on_command("Rules").matches(&text("/RULES")));
        assert!(!on_command("rules").matches(&text("/setrules x")));
        assert!(!on_command("rules").matches(&text("rules")));
    }

    #[test]
    fn test_on_commands_matches_aliases() {
        let m = on_commands(&["resetwarn", "resetwarns"]);
        assert!(m.matches(&text("/resetwarns @x")));
        assert!(m.matches(&text("/resetwarn @x")));
        assert!(!m.matches(&text("/warns")));
    }

    #[test]
    fn test_on_callback_prefix() {
        let ctx = make(Update::CallbackQuery(CallbackQuery {
            id: "q".into(),
            from: User::new(UserId(7), "Alice"),
            message: None,
            chat: None,
            data: "help_next(0)".into(),
        }));
        assert!(on_callback("help_").matches(&ctx));
        assert!(!on_callback("stngs_").matches(&ctx));
        assert!(!on_message().matches(&ctx));
    }

    #[test]
    fn test_on_migration_requires_ids() {
        let ctx = make(Update::ChatMigration(ChatMigration {
            chat: Chat::group(ChatId(-1), "g"),
            migrate_to: None,
            migrate_from: None,
        }));
        assert!(!on_migration().matches(&ctx));
    }
}
