//! Command recognition.
//!
//! A command is a message whose first token starts with one of the accepted
//! prefixes (`/`, plus `!` when enabled):
//!
//! ```text
//! /warn@rose_bot @spammer flooding
//! │└─┬┘ └──┬───┘ └───────┬───────┘
//! │ name  target      arguments
//! prefix
//! ```
//!
//! A command addressed to a different bot (`/warn@other_bot`) is not a
//! command for us.  Names are compared case-insensitively.

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Lowercased command name without prefix or `@bot` suffix.
    pub name: String,
    /// Everything after the first token, trimmed.
    pub raw_args: String,
}

impl Command {
    /// Whitespace-separated arguments.
    pub fn args(&self) -> Vec<&str> {
        self.raw_args.split_whitespace().collect()
    }

    /// Splits off the first argument, returning it and the rest.
    pub fn split_first_arg(&self) -> Option<(&str, &str)> {
        let raw = self.raw_args.as_str();
        if raw.is_empty() {
            return None;
        }
        match raw.split_once(char::is_whitespace) {
            Some((first, rest)) => Some((first, rest.trim_start())),
            None => Some((raw, "")),
        }
    }
}

/// Parses commands for a bot with a given set of prefixes.
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefixes: Vec<char>,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self { prefixes: vec!['/'] }
    }
}

impl CommandParser {
    pub fn new(prefixes: impl IntoIterator<Item = char>) -> Self {
        Self {
            prefixes: prefixes.into_iter().collect(),
        }
    }

    /// `/` always, `!` when `allow_excl` is set.
    pub fn with_excl(allow_excl: bool) -> Self {
        if allow_excl {
            Self::new(['/', '!'])
        } else {
            Self::default()
        }
    }

    pub fn prefixes(&self) -> &[char] {
        &self.prefixes
    }

    /// Parses `text` as a command for the bot named `bot_username`.
    pub fn parse(&self, text: &str, bot_username: &str) -> Option<Command> {
        let text = text.trim_start();
        let mut chars = text.chars();
        let prefix = chars.next()?;
        if !self.prefixes.contains(&prefix) {
            return None;
        }

        let body = chars.as_str();
        let (head, rest) = match body.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (body, ""),
        };

        let name = match head.split_once('@') {
            Some((name, target)) => {
                if !target.eq_ignore_ascii_case(bot_username) {
                    return None;
                }
                name
            }
            None => head,
        };

        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }

        Some(Command {
            name: name.to_lowercase(),
            raw_args: rest.to_string(),
        })
    }
}
