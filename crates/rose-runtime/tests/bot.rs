//! End-to-end behaviour of a runtime loaded with the bundled modules.

use std::future::pending;
use std::sync::Arc;

use rose_core::testing::{Outgoing, RecordingBot};
use rose_core::{
    CallbackQuery, Chat, ChatId, ChatMigration, Message, Update, User, UserId,
};
use rose_framework::ModuleLoadError;
use rose_framework::presenter::MODULE_UNAVAILABLE;
use rose_runtime::{RoseConfig, RoseRuntime};
use serde_json::json;
use tokio::sync::mpsc;

const GROUP: ChatId = ChatId(-100);
const OWNER: UserId = UserId(99);
const SUDO: UserId = UserId(98);
const ADMIN: UserId = UserId(10);

fn config() -> RoseConfig {
    let mut config = RoseConfig::default();
    config.bot.owner_id = Some(OWNER);
    config.bot.sudo_users = vec![SUDO];
    config.help.page_size = 2;
    config.logging.level = "warn".into();
    config
}

struct Harness {
    runtime: RoseRuntime,
    bot: Arc<RecordingBot>,
}

impl Harness {
    fn new(config: RoseConfig) -> Self {
        let runtime = RoseRuntime::from_config(config, &rose_modules::catalog());
        let bot = RecordingBot::new("rose_bot");
        bot.add_chat(group(GROUP));
        bot.set_admin(GROUP, ADMIN);
        Self { runtime, bot }
    }

    async fn send(&self, update: Update) -> bool {
        self.runtime.handle_update(self.bot.clone(), update).await
    }

    /// Sends and returns the texts the bot produced in response.
    async fn texts(&self, update: Update) -> Vec<String> {
        self.bot.clear();
        self.send(update).await;
        self.bot.sent_texts()
    }
}

fn user(id: UserId, name: &str) -> User {
    User::new(id, name)
}

fn group(id: ChatId) -> Chat {
    Chat::group(id, "Test Group")
}

fn in_group(chat: ChatId, from: &User, text: &str) -> Update {
    Update::Message(Message::new(1, group(chat), from.clone(), text))
}

fn reply_in_group(chat: ChatId, from: &User, text: &str, to: &User) -> Update {
    let original = Message::new(1, group(chat), to.clone(), "hello");
    Update::Message(Message::new(2, group(chat), from.clone(), text).replying_to(original))
}

fn in_private(from: &User, text: &str) -> Update {
    Update::Message(Message::new(1, Chat::private(from.id), from.clone(), text))
}

fn press(from: &User, chat: Chat, data: &str) -> Update {
    Update::CallbackQuery(CallbackQuery {
        id: "q".into(),
        from: from.clone(),
        message: None,
        chat: Some(chat),
        data: data.into(),
    })
}

fn button_labels(outgoing: &Outgoing) -> Vec<String> {
    outgoing
        .keyboard()
        .map(|k| k.buttons().map(|b| b.text.clone()).collect())
        .unwrap_or_default()
}

// ===== Help =====

#[tokio::test]
async fn test_help_menu_is_paginated_in_load_order() {
    let h = Harness::new(config());
    let alice = user(UserId(7), "Alice");

    h.send(in_private(&alice, "/help")).await;
    let first = h.bot.last_text().unwrap();
    assert!(first.text().unwrap().ends_with("_Page 1/3_"));
    assert_eq!(button_labels(&first), ["Rules", "Warnings", ">"]);

    h.send(press(&alice, Chat::private(alice.id), "help_next(0)")).await;
    let second = h.bot.last_text().unwrap();
    assert!(second.text().unwrap().ends_with("_Page 2/3_"));
    assert_eq!(
        button_labels(&second),
        ["Users", "Bios & Abouts", "<", "Back", ">"]
    );

    h.send(press(&alice, Chat::private(alice.id), "help_next(1)")).await;
    let third = h.bot.last_text().unwrap();
    assert_eq!(button_labels(&third), ["Shout", "Black Out", "<", "Back"]);
}

#[tokio::test]
async fn test_module_help_by_name_and_by_button() {
    let h = Harness::new(config());
    let alice = user(UserId(7), "Alice");

    let texts = h.texts(in_private(&alice, "/help Warnings")).await;
    assert!(texts[0].starts_with("*Warnings Module Help:*\n"));

    let texts = h
        .texts(press(&alice, Chat::private(alice.id), "help_module(black out)"))
        .await;
    assert!(texts[0].starts_with("*Black Out Module Help:*\n"));
}

#[tokio::test]
async fn test_stale_help_button_falls_back_to_first_page() {
    let h = Harness::new(config());
    let alice = user(UserId(7), "Alice");

    h.bot.clear();
    h.send(press(&alice, Chat::private(alice.id), "help_module(rss)"))
        .await;
    let calls = h.bot.calls();
    assert!(calls[0].text().unwrap().ends_with("_Page 1/3_"));
    assert_eq!(
        calls[1],
        Outgoing::Answered {
            query_id: "q".into(),
            text: Some(MODULE_UNAVAILABLE.into()),
        }
    );
}

#[tokio::test]
async fn test_help_in_group_points_to_pm() {
    let h = Harness::new(config());
    let texts = h
        .texts(in_group(GROUP, &user(UserId(7), "Alice"), "/help"))
        .await;
    assert_eq!(texts, ["Contact me in PM for commands:"]);
}

// ===== Dispatch =====

#[tokio::test]
async fn test_commands_for_other_bots_are_ignored() {
    let h = Harness::new(config());
    let admin = user(ADMIN, "Admin");
    h.send(in_group(GROUP, &admin, "/setrules Be nice.")).await;

    let texts = h.texts(in_group(GROUP, &admin, "/rules@OtherBot")).await;
    assert!(texts.is_empty());

    let texts = h.texts(in_group(GROUP, &admin, "/rules@rose_bot")).await;
    assert_eq!(texts.last().map(String::as_str), Some("I've PM'ed you this group rule's!"));
}

#[tokio::test]
async fn test_rules_deep_link_preempts_start() {
    let h = Harness::new(config());
    let admin = user(ADMIN, "Admin");
    h.send(in_group(GROUP, &admin, "/setrules Be nice.")).await;

    let texts = h
        .texts(in_private(&user(UserId(7), "Alice"), "/start -100"))
        .await;
    assert_eq!(texts, ["The rules for *Test Group* are:\n\nBe nice."]);

    let texts = h.texts(in_private(&user(UserId(7), "Alice"), "/start")).await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Hey there! I'm Rose"));
}

// ===== Migration =====

#[tokio::test]
async fn test_migration_rekeys_every_module() {
    let h = Harness::new(config());
    let admin = user(ADMIN, "Admin");
    let bob = user(UserId(20), "Bob");
    let new_chat = ChatId(-1000);

    h.send(in_group(GROUP, &admin, "/setrules Be nice.")).await;
    h.send(reply_in_group(GROUP, &admin, "/warn spam", &bob)).await;

    let matched = h
        .send(Update::ChatMigration(ChatMigration {
            chat: group(GROUP),
            migrate_to: Some(new_chat),
            migrate_from: None,
        }))
        .await;
    assert!(matched);

    let texts = h
        .texts(in_private(&user(SUDO, "Sudo"), "/chatlist"))
        .await;
    assert_eq!(texts, ["List of chats:\nTest Group - (-1000)"]);

    h.bot.set_admin(new_chat, ADMIN);
    let texts = h.texts(in_group(new_chat, &bob, "/warns")).await;
    assert_eq!(
        texts,
        ["This user has 1/3 warnings, for the following reasons:\n - spam"]
    );

    let texts = h.texts(in_group(GROUP, &bob, "/rules")).await;
    assert!(texts[0].starts_with("The group admins haven't set any rules"));

    let texts = h.texts(in_group(new_chat, &bob, "/rules")).await;
    assert_eq!(texts.last().map(String::as_str), Some("I've PM'ed you this group rule's!"));
}

// ===== Stats / info =====

#[tokio::test]
async fn test_stats_are_for_sudo_users_only() {
    let h = Harness::new(config());
    let admin = user(ADMIN, "Admin");
    h.send(in_group(GROUP, &admin, "/setrules Be nice.")).await;

    assert!(!h.send(in_private(&admin, "/stats")).await);

    let texts = h.texts(in_private(&user(SUDO, "Sudo"), "/stats")).await;
    assert_eq!(
        texts,
        ["Current stats:\n1 chats have rules set.\n0 overall warns, across 0 chats.\n1 users, across 1 chats"]
    );

    // The owner is implicitly sudo.
    assert!(h.send(in_private(&user(OWNER, "Owner"), "/stats")).await);
}

#[tokio::test]
async fn test_info_combines_module_fragments() {
    let h = Harness::new(config());
    let alice = user(UserId(7), "Alice").with_username("alice");

    h.send(in_group(GROUP, &alice, "/setme I like tea")).await;
    let texts = h.texts(in_group(GROUP, &alice, "/info")).await;
    assert_eq!(
        texts,
        ["*User info*:\nID: `7`\nFirst Name: Alice\nUsername: @alice\n\n\
          I've seen them in 1 chats in total.\n\n*About user:*\nI like tea"]
    );

    let texts = h.texts(in_group(GROUP, &alice, "/info bob")).await;
    assert_eq!(texts, ["I can't extract a user from this."]);
}

// ===== Backups =====

#[tokio::test]
async fn test_export_then_import_into_another_chat() {
    let h = Harness::new(config());
    let admin = user(ADMIN, "Admin");
    let other = ChatId(-200);
    h.bot.set_admin(other, ADMIN);

    h.send(in_group(GROUP, &admin, "/setrules Be nice.")).await;
    let texts = h.texts(in_group(GROUP, &admin, "/export")).await;
    let json_text = texts[0]
        .strip_prefix("Here's this chat's backup:\n\n")
        .unwrap();
    let document: serde_json::Value = serde_json::from_str(json_text).unwrap();
    assert_eq!(document, json!({ "rules": { "rules": "Be nice." } }));

    let texts = h
        .texts(in_group(other, &admin, &format!("/import {json_text}")))
        .await;
    assert_eq!(texts.last().map(String::as_str), Some("Backup imported! Restored: rules."));

    let texts = h.texts(in_group(other, &admin, "/import [1, 2]")).await;
    assert_eq!(texts.last().map(String::as_str), Some("That doesn't look like a valid backup."));

    let texts = h
        .texts(in_group(other, &user(UserId(7), "Alice"), "/export"))
        .await;
    assert_eq!(texts, ["You need to be an admin to do this."]);
}

// ===== Loading =====

#[tokio::test]
async fn test_failing_module_is_left_out() {
    let mut config = config();
    config
        .module_config
        .insert("warns".into(), json!({ "default_limit": 1 }));
    let h = Harness::new(config);

    let registry = h.runtime.registry();
    assert!(registry.get("warnings").is_none());
    assert!(matches!(
        registry.failures(),
        [ModuleLoadError::Init { name, .. }] if name == "warns"
    ));
    assert_eq!(registry.len(), 5);

    let texts = h
        .texts(reply_in_group(GROUP, &user(ADMIN, "Admin"), "/warn", &user(UserId(20), "Bob")))
        .await;
    assert!(texts.is_empty());
}

#[tokio::test]
async fn test_module_config_reaches_factories() {
    let mut config = config();
    config
        .module_config
        .insert("warns".into(), json!({ "default_limit": 4, "soft_warn": false }));
    let h = Harness::new(config);
    let admin = user(ADMIN, "Admin");
    let bob = user(UserId(20), "Bob");

    for _ in 0..3 {
        h.send(reply_in_group(GROUP, &admin, "/warn", &bob)).await;
    }
    assert!(!h.bot.calls().iter().any(|c| matches!(c, Outgoing::Banned { .. })));

    let texts = h.texts(reply_in_group(GROUP, &admin, "/warn", &bob)).await;
    assert_eq!(texts, ["Bob has been banned for reaching 4 warnings!"]);
    assert!(h.bot.calls().contains(&Outgoing::Banned {
        chat: GROUP,
        user: bob.id,
    }));

    // The count was reset.
    let texts = h.texts(in_group(GROUP, &bob, "/warns")).await;
    assert_eq!(texts, ["This user has no warnings!"]);
}

#[tokio::test]
async fn test_load_and_no_load_select_modules() {
    let mut skipping = config();
    skipping.modules.no_load = vec!["shout".into(), "blackout".into()];
    let h = Harness::new(skipping);
    assert_eq!(h.runtime.registry().len(), 4);
    assert!(
        h.texts(in_group(GROUP, &user(UserId(7), "Alice"), "/shout hi"))
            .await
            .is_empty()
    );

    let mut only = config();
    only.modules.load = vec!["rules".into(), "weather".into()];
    let h = Harness::new(only);
    let registry = h.runtime.registry();
    assert_eq!(registry.len(), 1);
    assert!(matches!(
        registry.failures(),
        [ModuleLoadError::Unknown { name }] if name == "weather"
    ));
}

// ===== Settings =====

#[tokio::test]
async fn test_chat_settings_deep_link_for_admins() {
    let h = Harness::new(config());
    let admin = user(ADMIN, "Admin");
    h.send(in_group(GROUP, &admin, "/setrules Be nice.")).await;

    let texts = h.texts(in_group(GROUP, &admin, "/settings")).await;
    assert_eq!(texts, ["Click here to get this chat's settings, as well as yours."]);

    h.bot.clear();
    h.send(in_private(&admin, "/start stngs_-100")).await;
    let sent = h.bot.last_text().unwrap();
    assert_eq!(
        sent.text(),
        Some(
            "These are the settings for *Test Group*:\n\n\
             *Rules*:\nThis chat has had its rules set: `true`\n\n\
             *Warnings*:\nIt takes `3` warns before the user gets *kicked*."
        )
    );
    assert_eq!(button_labels(&sent), ["Rules", "Warnings"]);

    let texts = h
        .texts(press(&admin, Chat::private(admin.id), "stngs_module(-100,warnings)"))
        .await;
    assert_eq!(
        texts,
        ["*Warnings* module settings:\n\nIt takes `3` warns before the user gets *kicked*."]
    );
}

// ===== Update loop =====

#[tokio::test]
async fn test_run_until_drains_the_channel() {
    let h = Harness::new(config());
    let alice = user(UserId(7), "Alice");
    let (tx, rx) = mpsc::channel(8);

    tx.send(in_group(GROUP, &alice, "/shout hi")).await.unwrap();
    tx.send(in_group(GROUP, &alice, "/blackout ok")).await.unwrap();
    drop(tx);

    h.runtime
        .run_until(h.bot.clone(), rx, pending())
        .await
        .unwrap();

    let mut texts = h.bot.sent_texts();
    texts.sort();
    assert_eq!(texts, ["```h i\ni i```", "🅞🅚"]);
}
