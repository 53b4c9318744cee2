//! Remembers who has been seen where.
//!
//! Other modules resolve `@username` arguments through this module's key
//! space (see [`crate::helpers::extract_user`]).
//!
//! Keys:
//!
//! | key               | value          |
//! |-------------------|----------------|
//! | `user:<id>`       | [`UserRecord`] |
//! | `username:<name>` | user id        |
//! | `chat:<id>`       | [`ChatRecord`] |

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use rose_core::{Chat, ChatId, User, UserId};
use rose_framework::{
    BoxError, Module, ModuleContext, ModuleDescriptor, Namespace, UpdateContext,
    on_command, on_message,
};

use crate::helpers::{bind, username_key};

pub const USERS: ModuleDescriptor = ModuleDescriptor::new("users", create);

/// Dispatch group of the logging matcher; after every command handler.
pub const USER_LOG_GROUP: i32 = 4;

const HELP: &str = "I remember the users I see, so that commands can take an @username.

*Owner only:*
 - /broadcast <text>: send a message to every chat I'm in.

*Sudo only:*
 - /chatlist: list every chat I'm in.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub chats: BTreeSet<ChatId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub title: String,
}

fn user_key(id: UserId) -> String {
    format!("user:{id}")
}

fn chat_key(id: ChatId) -> String {
    format!("chat:{id}")
}

struct Users {
    ns: Namespace,
    /// Our own id, learnt from the first update we log.
    self_id: Mutex<Option<UserId>>,
    lock: Mutex<()>,
}

impl Users {
    fn remember(&self, user: &User, chat: &Chat) -> Result<(), BoxError> {
        let _guard = self.lock.lock();
        let key = user_key(user.id);
        let mut record: UserRecord = self.ns.get(&key)?.unwrap_or_default();

        // The old handle may have been taken by someone else since.
        if record.username != user.username
            && let Some(old) = &record.username
            && self.ns.get::<UserId>(&username_key(old))? == Some(user.id)
        {
            self.ns.remove(&username_key(old));
        }
        if let Some(name) = &user.username {
            self.ns.set(&username_key(name), &user.id)?;
        }

        record.first_name = user.first_name.clone();
        record.username = user.username.clone();
        record.chats.insert(chat.id);
        self.ns.set(&key, &record)?;

        self.ns.set(
            &chat_key(chat.id),
            &ChatRecord {
                title: chat.display_title(),
            },
        )?;
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<Option<UserRecord>, BoxError> {
        Ok(self.ns.get(&user_key(id))?)
    }

    fn chats(&self) -> Result<Vec<(ChatId, ChatRecord)>, BoxError> {
        let mut chats = Vec::new();
        for key in self.ns.keys_with_prefix("chat:") {
            let Ok(id) = key.trim_start_matches("chat:").parse::<ChatId>() else {
                continue;
            };
            if let Some(record) = self.ns.get(&key)? {
                chats.push((id, record));
            }
        }
        Ok(chats)
    }

    fn user_count(&self) -> usize {
        self.ns.keys_with_prefix("user:").len()
    }

    fn migrate(&self, old: ChatId, new: ChatId) -> Result<(), BoxError> {
        let _guard = self.lock.lock();
        self.ns.rename(&chat_key(old), &chat_key(new));

        let mut moved = 0usize;
        for key in self.ns.keys_with_prefix("user:") {
            let Some(mut record) = self.ns.get::<UserRecord>(&key)? else {
                continue;
            };
            if record.chats.remove(&old) {
                record.chats.insert(new);
                self.ns.set(&key, &record)?;
                moved += 1;
            }
        }
        debug!(old_chat = %old, new_chat = %new, users = moved, "Migrated chat membership");
        Ok(())
    }
}

fn create(ctx: &ModuleContext) -> Result<Module, BoxError> {
    let users = Arc::new(Users {
        ns: ctx.namespace(),
        self_id: Mutex::new(None),
        lock: Mutex::new(()),
    });

    let owner_only = {
        let access = ctx.access();
        move |ctx: &UpdateContext| ctx.sender_id().is_some_and(|u| access.is_owner(u))
    };
    let sudo_only = {
        let access = ctx.access();
        move |ctx: &UpdateContext| ctx.sender_id().is_some_and(|u| access.is_sudo(u))
    };

    let module = Module::new("users")
        .display_name("Users")
        .help(HELP)
        .matcher(
            on_message()
                .group_only()
                .group(USER_LOG_GROUP)
                .name("users:log")
                .handler(bind(&users, log_user)),
        )
        .matcher(
            on_command("broadcast")
                .filter(owner_only)
                .handler(bind(&users, broadcast)),
        )
        .matcher(
            on_command("chatlist")
                .filter(sudo_only)
                .handler(bind(&users, chat_list)),
        );

    let module = module
        .on_migrate({
            let users = Arc::clone(&users);
            move |old, new| {
                let users = Arc::clone(&users);
                async move { users.migrate(old, new) }
            }
        })
        .on_stats({
            let users = Arc::clone(&users);
            move || {
                let users = Arc::clone(&users);
                async move {
                    let chats = users.chats()?.len();
                    Ok(format!("{} users, across {chats} chats", users.user_count()))
                }
            }
        })
        .on_user_info(move |user| {
            let users = Arc::clone(&users);
            async move { seen_in(&users, user) }
        });

    Ok(module)
}

fn seen_in(users: &Users, user: UserId) -> Result<String, BoxError> {
    if *users.self_id.lock() == Some(user) {
        return Ok("I'm in every chat they're in... Oh wait, it's me.".to_string());
    }
    Ok(match users.user(user)? {
        Some(record) => format!("I've seen them in {} chats in total.", record.chats.len()),
        None => String::new(),
    })
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn log_user(users: Arc<Users>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    users.self_id.lock().get_or_insert(ctx.bot().id());
    let Some(message) = ctx.message() else {
        return Ok(());
    };
    if let Some(sender) = &message.from {
        users.remember(sender, &message.chat)?;
    }
    if let Some(author) = message.reply_to.as_ref().and_then(|m| m.from.as_ref()) {
        users.remember(author, &message.chat)?;
    }
    Ok(())
}

async fn broadcast(users: Arc<Users>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let text = ctx.arg_text().trim();
    if text.is_empty() {
        ctx.reply("Give me something to broadcast.").await?;
        return Ok(());
    }

    let chats = users.chats()?;
    let mut failed = 0usize;
    for (chat, _) in &chats {
        if let Err(e) = ctx.bot().send_message(*chat, text, None).await {
            warn!(chat = %chat, error = %e, "Couldn't broadcast to chat");
            failed += 1;
        }
    }
    info!(chats = chats.len(), failed, "Broadcast finished");

    ctx.reply(&format!(
        "Broadcast complete. {failed} groups failed to receive the message."
    ))
    .await?;
    Ok(())
}

async fn chat_list(users: Arc<Users>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let mut text = String::from("List of chats:");
    for (id, chat) in users.chats()? {
        text.push_str(&format!("\n{} - ({id})", chat.title));
    }
    ctx.reply(&text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::testing::*;
    use rose_core::testing::RecordingBot;
    use rose_framework::{AccessControl, MemoryStore, ModuleEnv};

    fn env() -> ModuleEnv {
        let access = AccessControl::new(Some(UserId(99))).with_sudo([UserId(98)]);
        ModuleEnv::new(Arc::new(MemoryStore::new()), access)
    }

    #[tokio::test]
    async fn test_logs_sender_and_replied_user() {
        let env = env();
        let (module, dispatcher) = load(USERS, &env);
        let bot = RecordingBot::new("rose_bot");
        let alice = user(7, "Alice").with_username("Alice");

        let matched = dispatcher
            .dispatch(group_reply(&alice, "hi", &user(8, "Bob")), bot.clone())
            .await;
        assert!(matched);
        assert!(bot.calls().is_empty());

        let ns = env.context_for("users").namespace();
        assert_eq!(ns.get::<UserId>("username:alice").unwrap(), Some(UserId(7)));
        let record: UserRecord = ns.get("user:8").unwrap().unwrap();
        assert_eq!(record.chats.into_iter().collect::<Vec<_>>(), [GROUP]);

        let info = module.user_info_fn().unwrap();
        assert_eq!(
            info(UserId(7)).await.unwrap(),
            "I've seen them in 1 chats in total."
        );
        assert_eq!(info(UserId(1)).await.unwrap(), "I'm in every chat they're in... Oh wait, it's me.");
        assert_eq!(info(UserId(555)).await.unwrap(), "");

        let stats = module.stats_fn().unwrap();
        assert_eq!(stats().await.unwrap(), "2 users, across 1 chats");
    }

    #[tokio::test]
    async fn test_username_change_drops_old_index() {
        let env = env();
        let (_, dispatcher) = load(USERS, &env);
        let bot = RecordingBot::new("rose_bot");

        let before = user(7, "Alice").with_username("alice");
        let after = user(7, "Alice").with_username("alice2");
        dispatcher.dispatch(group_message(&before, "a"), bot.clone()).await;
        dispatcher.dispatch(group_message(&after, "b"), bot.clone()).await;

        let ns = env.context_for("users").namespace();
        assert!(!ns.contains("username:alice"));
        assert!(ns.contains("username:alice2"));
    }

    #[tokio::test]
    async fn test_username_change_keeps_handle_taken_by_another_user() {
        let env = env();
        let (_, dispatcher) = load(USERS, &env);
        let bot = RecordingBot::new("rose_bot");

        let first = user(7, "Alice").with_username("alice");
        let newcomer = user(9, "Alicia").with_username("alice");
        let renamed = user(7, "Alice").with_username("bob");
        dispatcher.dispatch(group_message(&first, "a"), bot.clone()).await;
        dispatcher.dispatch(group_message(&newcomer, "b"), bot.clone()).await;
        dispatcher.dispatch(group_message(&renamed, "c"), bot.clone()).await;

        let ns = env.context_for("users").namespace();
        assert_eq!(ns.get::<UserId>("username:alice").unwrap(), Some(UserId(9)));
        assert_eq!(ns.get::<UserId>("username:bob").unwrap(), Some(UserId(7)));
    }

    #[tokio::test]
    async fn test_broadcast_is_owner_only_and_counts_failures() {
        let env = env();
        let (_, dispatcher) = load(USERS, &env);
        let bot = RecordingBot::new("rose_bot");
        let ns = env.context_for("users").namespace();
        ns.set("chat:-100", &ChatRecord { title: "A".into() }).unwrap();
        ns.set("chat:-200", &ChatRecord { title: "B".into() }).unwrap();
        bot.set_unreachable(ChatId(-200));

        let sudo = user(98, "Sudo");
        assert!(
            !dispatcher
                .dispatch(private_message(&sudo, "/broadcast hello"), bot.clone())
                .await
        );

        let owner = user(99, "Owner");
        dispatcher
            .dispatch(private_message(&owner, "/broadcast hello"), bot.clone())
            .await;
        assert_eq!(
            bot.sent_texts(),
            [
                "hello",
                "Broadcast complete. 1 groups failed to receive the message."
            ]
        );
    }

    #[tokio::test]
    async fn test_chatlist_for_sudo() {
        let env = env();
        let (_, dispatcher) = load(USERS, &env);
        let bot = RecordingBot::new("rose_bot");
        dispatcher
            .dispatch(group_message(&user(7, "Alice"), "hi"), bot.clone())
            .await;

        dispatcher
            .dispatch(private_message(&user(98, "Sudo"), "/chatlist"), bot.clone())
            .await;
        assert_eq!(
            bot.sent_texts(),
            ["List of chats:\nTest Group - (-100)"]
        );
    }

    #[tokio::test]
    async fn test_migration_moves_membership() {
        let env = env();
        let (module, dispatcher) = load(USERS, &env);
        let bot = RecordingBot::new("rose_bot");
        dispatcher
            .dispatch(group_message(&user(7, "Alice"), "hi"), bot.clone())
            .await;

        let migrate = module.migrate_fn().unwrap();
        migrate(GROUP, ChatId(-1000)).await.unwrap();

        let ns = env.context_for("users").namespace();
        let record: UserRecord = ns.get("user:7").unwrap().unwrap();
        assert!(record.chats.contains(&ChatId(-1000)));
        assert!(!record.chats.contains(&GROUP));
        assert!(ns.contains("chat:-1000"));
    }

    #[tokio::test]
    async fn test_stats_count_users_logged_after_the_call() {
        let env = env();
        let (module, dispatcher) = load(USERS, &env);
        let bot = RecordingBot::new("rose_bot");

        let stats = module.stats_fn().unwrap()();
        dispatcher
            .dispatch(group_message(&user(7, "Alice"), "hi"), bot.clone())
            .await;
        assert_eq!(stats.await.unwrap(), "1 users, across 1 chats");
    }
}
