//! Console Bot
//!
//! Runs every bundled Rose module against the terminal. Each input line is
//! delivered as a message from the current user in the current chat; the
//! bot's replies are printed back.
//!
//! # Console commands
//!
//! ```text
//! :user <id> <name>   speak as another user
//! :pm | :group        switch between the private chat and the group
//! :admin              make the current user an admin of the group
//! :reply <text>       reply to the previous message
//! :press <data>       press an inline button
//! :migrate <chat id>  upgrade the group to a new chat id
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-bot -- --owner 1000
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use rose::core::{
    ApiError, ApiResult, ButtonAction, CallbackQuery, ChatMigration, Message, MessageId,
    MessageRef,
};
use rose::prelude::*;

#[derive(Debug, Parser)]
#[command(about = "Talk to Rose from the terminal")]
struct Args {
    /// Configuration file (defaults to rose.toml / config.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Owner user id, overriding the configuration
    #[arg(long)]
    owner: Option<i64>,

    /// Id of the simulated group
    #[arg(long, default_value_t = -100)]
    group: i64,
}

// ============================================================================
// ConsoleBot
// ============================================================================

#[derive(Default)]
struct Platform {
    chats: HashMap<ChatId, Chat>,
    admins: HashSet<(ChatId, UserId)>,
}

/// A [`Bot`] that prints instead of calling an API.
struct ConsoleBot {
    next_message: AtomicI64,
    platform: Mutex<Platform>,
}

impl ConsoleBot {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_message: AtomicI64::new(1),
            platform: Mutex::new(Platform::default()),
        })
    }

    fn add_chat(&self, chat: Chat) {
        self.platform.lock().chats.insert(chat.id, chat);
    }

    fn promote(&self, chat: ChatId, user: UserId) {
        self.platform.lock().admins.insert((chat, user));
    }

    fn message_id(&self) -> MessageId {
        MessageId(self.next_message.fetch_add(1, Ordering::SeqCst))
    }
}

fn print_keyboard(keyboard: Option<&InlineKeyboard>) {
    let Some(keyboard) = keyboard else {
        return;
    };
    for row in keyboard.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|b| match &b.action {
                ButtonAction::Callback(data) => format!("[{} :press {data}]", b.text),
                ButtonAction::Url(url) => format!("[{} -> {url}]", b.text),
            })
            .collect();
        println!("    {}", cells.join(" "));
    }
}

#[async_trait]
impl Bot for ConsoleBot {
    fn id(&self) -> UserId {
        UserId(1)
    }

    fn username(&self) -> &str {
        "rose_console_bot"
    }

    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> ApiResult<MessageRef> {
        println!("<{chat}> {text}");
        print_keyboard(keyboard.as_ref());
        Ok(MessageRef {
            chat_id: chat,
            message_id: self.message_id(),
        })
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> ApiResult<()> {
        println!("<{} edited #{}> {text}", message.chat_id, message.message_id);
        print_keyboard(keyboard.as_ref());
        Ok(())
    }

    async fn answer_callback(&self, _query_id: &str, text: Option<&str>) -> ApiResult<()> {
        if let Some(text) = text {
            println!("(toast) {text}");
        }
        Ok(())
    }

    async fn get_chat(&self, chat: ChatId) -> ApiResult<Chat> {
        self.platform
            .lock()
            .chats
            .get(&chat)
            .cloned()
            .ok_or(ApiError::ChatNotFound(chat))
    }

    async fn is_chat_admin(&self, chat: ChatId, user: UserId) -> ApiResult<bool> {
        Ok(self.platform.lock().admins.contains(&(chat, user)))
    }

    async fn ban_member(&self, chat: ChatId, user: UserId) -> ApiResult<()> {
        println!("(banned {user} from {chat})");
        Ok(())
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> ApiResult<()> {
        println!("(kicked {user} from {chat})");
        Ok(())
    }
}

// ============================================================================
// Input
// ============================================================================

struct Session {
    bot: Arc<ConsoleBot>,
    user: User,
    group: Chat,
    in_group: bool,
    last: Option<Message>,
    next_id: i64,
}

impl Session {
    fn chat(&self) -> Chat {
        if self.in_group {
            self.group.clone()
        } else {
            Chat::private(self.user.id)
        }
    }

    fn message(&mut self, text: &str) -> Message {
        self.next_id += 1;
        Message::new(self.next_id, self.chat(), self.user.clone(), text)
    }

    /// Turns one input line into an update, or handles it locally.
    fn parse(&mut self, line: &str) -> Option<Update> {
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        match head {
            ":user" => {
                let (id, name) = rest.split_once(' ').unwrap_or((rest, "User"));
                match id.parse() {
                    Ok(id) => self.user = User::new(id, name),
                    Err(_) => println!("usage: :user <id> <name>"),
                }
                None
            }
            ":pm" => {
                self.in_group = false;
                None
            }
            ":group" => {
                self.in_group = true;
                None
            }
            ":admin" => {
                self.bot.promote(self.group.id, self.user.id);
                println!("({} is now an admin)", self.user.first_name);
                None
            }
            ":reply" => {
                let message = match self.last.clone() {
                    Some(original) => self.message(rest).replying_to(original),
                    None => self.message(rest),
                };
                self.last = Some(message.clone());
                Some(Update::Message(message))
            }
            ":press" => Some(Update::CallbackQuery(CallbackQuery {
                id: format!("q{}", self.next_id),
                from: self.user.clone(),
                message: None,
                chat: Some(self.chat()),
                data: rest.to_string(),
            })),
            ":migrate" => match rest.parse::<ChatId>() {
                Ok(new) => {
                    let old = self.group.clone();
                    self.group.id = new;
                    self.bot.add_chat(self.group.clone());
                    Some(Update::ChatMigration(ChatMigration {
                        chat: old,
                        migrate_to: Some(new),
                        migrate_from: None,
                    }))
                }
                Err(_) => {
                    println!("usage: :migrate <chat id>");
                    None
                }
            },
            _ => {
                let message = self.message(line);
                self.last = Some(message.clone());
                Some(Update::Message(message))
            }
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = RoseRuntime::builder().catalog(rose::modules::catalog());
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(owner) = args.owner {
        builder = builder.set("bot.owner_id", owner);
    }
    let runtime = builder.build().context("failed to build the runtime")?;

    let bot = ConsoleBot::new();
    let group = Chat::group(ChatId(args.group), "Console Group");
    bot.add_chat(group.clone());

    let mut session = Session {
        bot: Arc::clone(&bot),
        user: User::new(UserId(args.owner.unwrap_or(1000)), "You"),
        group,
        in_group: true,
        last: None,
        next_id: 0,
    };

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(update) = session.parse(line)
                && tx.send(update).await.is_err()
            {
                break;
            }
        }
        info!("Input closed");
    });

    runtime.run(bot, rx).await?;
    Ok(())
}
