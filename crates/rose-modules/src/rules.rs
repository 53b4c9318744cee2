//! Per-chat rules, shown in the group or delivered by PM.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use rose_core::{ApiError, ChatId, InlineButton, InlineKeyboard};
use rose_framework::{
    BoxError, Module, ModuleContext, ModuleDescriptor, Namespace, UpdateContext, on_command,
};

use crate::helpers::ensure_admin;

pub const RULES: ModuleDescriptor = ModuleDescriptor::new("rules", create);

const HELP: &str = " - /rules: get the rules for this chat.

*Admin only:*
 - /setrules <your rules here>: set the rules for this chat.
 - /clearrules: clear the rules for this chat.";

const NO_RULES: &str = "The group admins haven't set any rules for this chat yet. \
This probably doesn't mean it's lawless though...!";

const BAD_SHORTCUT: &str =
    "The rules shortcut for this chat hasn't been set properly! Ask admins to fix this.";

/// Rules text keyed by chat id.
#[derive(Clone)]
struct RulesStore {
    ns: Namespace,
}

impl RulesStore {
    fn get(&self, chat: ChatId) -> Result<Option<String>, BoxError> {
        Ok(self
            .ns
            .get::<String>(&chat.to_string())?
            .filter(|r| !r.is_empty()))
    }

    fn set(&self, chat: ChatId, rules: &str) -> Result<(), BoxError> {
        if rules.is_empty() {
            self.ns.remove(&chat.to_string());
        } else {
            self.ns.set(&chat.to_string(), rules)?;
        }
        Ok(())
    }

    fn count(&self) -> usize {
        self.ns.keys().len()
    }
}

fn create(ctx: &ModuleContext) -> Result<Module, BoxError> {
    let store = RulesStore {
        ns: ctx.namespace(),
    };

    let module = Module::new("rules")
        .display_name("Rules")
        .help(HELP)
        .matcher(on_command("rules").group_only().handler({
            let store = store.clone();
            move |ctx| get_rules(store.clone(), ctx)
        }))
        // Deep link from the "Rules" button; runs ahead of the core /start.
        .matcher(
            on_command("start")
                .private_only()
                .filter(|ctx| deep_link_chat(ctx).is_some())
                .group(-1)
                .block(true)
                .handler({
                    let store = store.clone();
                    move |ctx| rules_deep_link(store.clone(), ctx)
                }),
        )
        .matcher(on_command("setrules").group_only().handler({
            let store = store.clone();
            move |ctx| set_rules(store.clone(), ctx)
        }))
        .matcher(on_command("clearrules").group_only().handler({
            let store = store.clone();
            move |ctx| clear_rules(store.clone(), ctx)
        }));

    let module = module
        .on_migrate({
            let store = store.clone();
            move |old, new| {
                let store = store.clone();
                async move {
                    store.ns.rename(&old.to_string(), &new.to_string());
                    Ok(())
                }
            }
        })
        .on_stats({
            let store = store.clone();
            move || {
                let store = store.clone();
                async move { Ok(format!("{} chats have rules set.", store.count())) }
            }
        })
        .on_chat_settings({
            let store = store.clone();
            move |chat, _user| {
                let store = store.clone();
                async move {
                    let has_rules = store.get(chat)?.is_some();
                    Ok(format!("This chat has had its rules set: `{has_rules}`"))
                }
            }
        })
        .on_import({
            let store = store.clone();
            move |chat, data: Value| {
                let store = store.clone();
                async move {
                    let rules = data.get("rules").and_then(Value::as_str).unwrap_or_default();
                    store.set(chat, rules)
                }
            }
        })
        .on_export(move |chat| {
            let store = store.clone();
            async move { Ok(json!({ "rules": store.get(chat)?.unwrap_or_default() })) }
        });

    Ok(module)
}

fn deep_link_chat(ctx: &UpdateContext) -> Option<ChatId> {
    ctx.args().first()?.parse().ok()
}

async fn get_rules(store: RulesStore, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let Some(chat) = ctx.chat() else {
        return Ok(());
    };
    let Some(rules) = store.get(chat.id)? else {
        ctx.reply(NO_RULES).await?;
        return Ok(());
    };

    let text = format!("The rules for *{}* are:\n\n{rules}", chat.display_title());
    match ctx.send_private(&text, None).await {
        Ok(_) => {
            ctx.reply("I've PM'ed you this group rule's!").await?;
        }
        Err(ApiError::Forbidden(_)) => {
            debug!(chat = %chat.id, "Sender has not started a PM, offering a link");
            let keyboard = InlineKeyboard::new().row(vec![InlineButton::url(
                "Rules",
                format!("https://t.me/{}?start={}", ctx.bot().username(), chat.id),
            )]);
            ctx.reply_with("Contact me in PM to get this group's rules!", keyboard)
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn rules_deep_link(store: RulesStore, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let Some(chat_id) = deep_link_chat(&ctx) else {
        return Ok(());
    };
    let chat = match ctx.bot().get_chat(chat_id).await {
        Ok(chat) => chat,
        Err(ApiError::ChatNotFound(_)) => {
            ctx.reply(BAD_SHORTCUT).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match store.get(chat_id)? {
        Some(rules) => {
            let text = format!("The rules for *{}* are:\n\n{rules}", chat.display_title());
            ctx.reply(&text).await?;
        }
        None => {
            ctx.reply(NO_RULES).await?;
        }
    }
    Ok(())
}

async fn set_rules(store: RulesStore, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let (Some(chat), rules) = (ctx.chat_id(), ctx.arg_text().trim()) else {
        return Ok(());
    };
    if rules.is_empty() {
        ctx.reply("You need to give me some rules to set!").await?;
        return Ok(());
    }
    store.set(chat, rules)?;
    ctx.reply("Successfully set rules for this group.").await?;
    Ok(())
}

async fn clear_rules(store: RulesStore, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    if let Some(chat) = ctx.chat_id() {
        store.set(chat, "")?;
        ctx.reply("Successfully cleared rules!").await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::testing::*;
    use rose_core::testing::{Outgoing, RecordingBot};
    use rose_core::{ButtonAction, UserId};
    use rose_framework::ModuleEnv;

    #[tokio::test]
    async fn test_set_and_get_rules_by_pm() {
        let env = ModuleEnv::default();
        let (_, dispatcher) = load(RULES, &env);
        let bot = RecordingBot::new("rose_bot");
        let admin = user(10, "Admin");
        bot.set_admin(GROUP, admin.id);

        dispatcher
            .dispatch(group_message(&admin, "/setrules Be nice."), bot.clone())
            .await;
        assert_eq!(
            bot.last_text().and_then(|o| o.text().map(str::to_string)).as_deref(),
            Some("Successfully set rules for this group.")
        );

        bot.clear();
        dispatcher
            .dispatch(group_message(&user(20, "Bob"), "/rules"), bot.clone())
            .await;
        let calls = bot.calls();
        assert_eq!(
            calls[0],
            Outgoing::Sent {
                chat: ChatId(20),
                text: "The rules for *Test Group* are:\n\nBe nice.".into(),
                keyboard: None,
            }
        );
        assert_eq!(calls[1].text(), Some("I've PM'ed you this group rule's!"));
    }

    #[tokio::test]
    async fn test_rules_link_when_pm_is_closed() {
        let env = ModuleEnv::default();
        let (_, dispatcher) = load(RULES, &env);
        env.context_for("rules").namespace().set("-100", "No spam").unwrap();
        let bot = RecordingBot::new("rose_bot");
        bot.set_unreachable(ChatId(20));

        dispatcher
            .dispatch(group_message(&user(20, "Bob"), "/rules"), bot.clone())
            .await;
        let last = bot.last_text().unwrap();
        assert_eq!(last.text(), Some("Contact me in PM to get this group's rules!"));
        let button = last.keyboard().and_then(|k| k.find("Rules")).unwrap();
        assert_eq!(
            button.action,
            ButtonAction::Url("https://t.me/rose_bot?start=-100".into())
        );
    }

    #[tokio::test]
    async fn test_deep_link_sends_rules() {
        let env = ModuleEnv::default();
        let (_, dispatcher) = load(RULES, &env);
        env.context_for("rules").namespace().set("-100", "No spam").unwrap();
        let bot = RecordingBot::new("rose_bot");
        bot.add_chat(group());
        let bob = user(20, "Bob");

        assert!(
            dispatcher
                .dispatch(private_message(&bob, "/start -100"), bot.clone())
                .await
        );
        assert_eq!(
            bot.sent_texts(),
            ["The rules for *Test Group* are:\n\nNo spam"]
        );

        bot.clear();
        dispatcher
            .dispatch(private_message(&bob, "/start -555"), bot.clone())
            .await;
        assert_eq!(bot.sent_texts(), [BAD_SHORTCUT]);

        // Not a chat id: left for the core /start.
        assert!(
            !dispatcher
                .dispatch(private_message(&bob, "/start help"), bot.clone())
                .await
        );
    }

    #[tokio::test]
    async fn test_non_admins_cannot_set_rules() {
        let env = ModuleEnv::default();
        let (_, dispatcher) = load(RULES, &env);
        let bot = RecordingBot::new("rose_bot");

        dispatcher
            .dispatch(group_message(&user(20, "Bob"), "/setrules anarchy"), bot.clone())
            .await;
        assert_eq!(bot.sent_texts(), [crate::helpers::NOT_ADMIN]);
        assert!(env.context_for("rules").namespace().keys().is_empty());
    }

    #[tokio::test]
    async fn test_capabilities() {
        let env = ModuleEnv::default();
        let (module, _) = load(RULES, &env);
        let ns = env.context_for("rules").namespace();
        ns.set("-100", "Be nice.").unwrap();

        let stats = module.stats_fn().unwrap();
        assert_eq!(stats().await.unwrap(), "1 chats have rules set.");

        let settings = module.chat_settings_fn().unwrap();
        assert_eq!(
            settings(GROUP, UserId(10)).await.unwrap(),
            "This chat has had its rules set: `true`"
        );
        assert_eq!(
            settings(ChatId(-7), UserId(10)).await.unwrap(),
            "This chat has had its rules set: `false`"
        );

        let migrate = module.migrate_fn().unwrap();
        migrate(GROUP, ChatId(-1000)).await.unwrap();
        assert_eq!(ns.keys(), ["-1000"]);

        let export = module.export_fn().unwrap();
        assert_eq!(
            export(ChatId(-1000)).await.unwrap(),
            json!({ "rules": "Be nice." })
        );

        let import = module.import_fn().unwrap();
        import(ChatId(-5), json!({ "rules": "Imported" })).await.unwrap();
        assert_eq!(ns.get::<String>("-5").unwrap().as_deref(), Some("Imported"));
    }
}
