//! Self-written "about me" text and bios written by others.

use std::sync::Arc;

use rose_core::UserId;
use rose_framework::{
    AccessControl, BoxError, Module, ModuleContext, ModuleDescriptor, Namespace, UpdateContext,
    on_command,
};

use crate::helpers::{MAX_INFO_LEN, Target, bind, extract_user};

pub const USERINFO: ModuleDescriptor = ModuleDescriptor::new("userinfo", create);

const HELP: &str = " - /setbio <text>: while replying, will save another user's bio.
 - /bio: will get your or another user's bio. This cannot be set by yourself.
 - /setme <text>: will set your info.
 - /me: will get your or another user's info.";

struct UserInfo {
    ns: Namespace,
    users: Namespace,
    access: Arc<AccessControl>,
}

fn me_key(user: UserId) -> String {
    format!("me:{user}")
}

fn bio_key(user: UserId) -> String {
    format!("bio:{user}")
}

impl UserInfo {
    fn text(&self, key: &str) -> Result<Option<String>, BoxError> {
        Ok(self.ns.get::<String>(key)?.filter(|t| !t.is_empty()))
    }

    /// The replied-to author, an explicit argument, or the sender.
    fn target(&self, ctx: &UpdateContext) -> Option<Target> {
        extract_user(ctx, &self.users).or_else(|| {
            ctx.sender().map(|user| Target {
                id: user.id,
                user: Some(user.clone()),
            })
        })
    }
}

fn create(ctx: &ModuleContext) -> Result<Module, BoxError> {
    let info = Arc::new(UserInfo {
        ns: ctx.namespace(),
        users: ctx.namespace_named("users"),
        access: ctx.access(),
    });

    let module = Module::new("userinfo")
        .display_name("Bios & Abouts")
        .help(HELP)
        .matcher(on_command("setme").handler(bind(&info, set_about_me)))
        .matcher(on_command("me").handler(bind(&info, about_me)))
        .matcher(on_command("setbio").handler(bind(&info, set_bio)))
        .matcher(on_command("bio").handler(bind(&info, about_bio)))
        .on_user_info(move |user| {
            let info = Arc::clone(&info);
            async move { profile_fragment(&info, user) }
        });

    Ok(module)
}

fn profile_fragment(info: &UserInfo, user: UserId) -> Result<String, BoxError> {
    let me = info.text(&me_key(user))?;
    let bio = info.text(&bio_key(user))?;
    Ok(match (me, bio) {
        (Some(me), Some(bio)) => {
            format!("*About user:*\n{me}\n\n*What others say:*\n{bio}")
        }
        (Some(me), None) => format!("*About user:*\n{me}"),
        (None, Some(bio)) => format!("*What others say:*\n{bio}"),
        (None, None) => String::new(),
    })
}

fn too_long(text: &str) -> Option<usize> {
    let len = text.chars().count();
    (len > MAX_INFO_LEN).then_some(len)
}

async fn set_about_me(info: Arc<UserInfo>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let Some(sender) = ctx.sender_id() else {
        return Ok(());
    };
    let text = ctx.arg_text().trim();
    if text.is_empty() {
        ctx.reply("Just use /setme to set your own info.").await?;
        return Ok(());
    }

    // Sudo users may write the bot's own info by replying to it.
    let bot_id = ctx.bot().id();
    let replying_to_bot = ctx
        .replied()
        .and_then(|m| m.from.as_ref())
        .is_some_and(|u| u.id == bot_id);
    let target = if replying_to_bot && info.access.is_sudo(sender) {
        bot_id
    } else {
        sender
    };

    if let Some(len) = too_long(text) {
        ctx.reply(&format!(
            "The info needs to be under {MAX_INFO_LEN} characters! You have {len}."
        ))
        .await?;
        return Ok(());
    }

    info.ns.set(&me_key(target), text)?;
    let done = if target == bot_id {
        "Updated my info!"
    } else {
        "Updated your info!"
    };
    ctx.reply(done).await?;
    Ok(())
}

async fn about_me(info: Arc<UserInfo>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let Some(target) = info.target(&ctx) else {
        return Ok(());
    };
    let text = match info.text(&me_key(target.id))? {
        Some(me) => format!("*{}*:\n{me}", target.display_name()),
        None if Some(target.id) == ctx.sender_id() => {
            "You haven't set an info message about yourself yet!".to_string()
        }
        None => format!(
            "{} hasn't set an info message about themselves yet!",
            target.display_name()
        ),
    };
    ctx.reply(&text).await?;
    Ok(())
}

async fn set_bio(info: Arc<UserInfo>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let Some(sender) = ctx.sender_id() else {
        return Ok(());
    };
    let Some(target) = ctx.replied().and_then(|m| m.from.clone()) else {
        ctx.reply("Reply to someone's message to set their bio!")
            .await?;
        return Ok(());
    };

    let bot_id = ctx.bot().id();
    let refusal = if target.id == sender {
        Some("Ha, you can't set your own bio! You're at the mercy of others here...")
    } else if target.id == bot_id && !info.access.is_sudo(sender) {
        Some("Only sudo users can update my bio.")
    } else if info.access.is_owner(target.id) && !info.access.is_owner(sender) {
        Some("You can't modify the owner's bio")
    } else {
        None
    };
    if let Some(refusal) = refusal {
        ctx.reply(refusal).await?;
        return Ok(());
    }

    let text = ctx.arg_text().trim();
    if text.is_empty() {
        ctx.reply("Give me some text to set as their bio!").await?;
        return Ok(());
    }
    if let Some(len) = too_long(text) {
        ctx.reply(&format!(
            "Bio needs to be under {MAX_INFO_LEN} characters! You tried to set {len}."
        ))
        .await?;
        return Ok(());
    }

    info.ns.set(&bio_key(target.id), text)?;
    ctx.reply(&format!("Updated {}'s bio!", target.first_name))
        .await?;
    Ok(())
}

async fn about_bio(info: Arc<UserInfo>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let Some(target) = info.target(&ctx) else {
        return Ok(());
    };
    let text = match info.text(&bio_key(target.id))? {
        Some(bio) => format!("*{}*:\n{bio}", target.display_name()),
        None if Some(target.id) == ctx.sender_id() => {
            "You haven't had a bio set about yourself yet!".to_string()
        }
        None => format!(
            "{} hasn't had a message set about themselves yet!",
            target.display_name()
        ),
    };
    ctx.reply(&text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::testing::*;
    use rose_core::testing::RecordingBot;
    use rose_framework::{MemoryStore, ModuleEnv};

    fn env() -> ModuleEnv {
        let access = AccessControl::new(Some(UserId(99))).with_sudo([UserId(98)]);
        ModuleEnv::new(Arc::new(MemoryStore::new()), access)
    }

    #[tokio::test]
    async fn test_setme_and_me() {
        let env = env();
        let (_, dispatcher) = load(USERINFO, &env);
        let bot = RecordingBot::new("rose_bot");
        let alice = user(7, "Alice");

        dispatcher
            .dispatch(group_message(&alice, "/me"), bot.clone())
            .await;
        dispatcher
            .dispatch(group_message(&alice, "/setme I like tea"), bot.clone())
            .await;
        dispatcher
            .dispatch(group_reply(&user(8, "Bob"), "/me", &alice), bot.clone())
            .await;
        assert_eq!(
            bot.sent_texts(),
            [
                "You haven't set an info message about yourself yet!",
                "Updated your info!",
                "*Alice*:\nI like tea",
            ]
        );
    }

    #[tokio::test]
    async fn test_setme_length_limit() {
        let env = env();
        let (_, dispatcher) = load(USERINFO, &env);
        let bot = RecordingBot::new("rose_bot");
        let long = "a".repeat(MAX_INFO_LEN + 1);

        dispatcher
            .dispatch(group_message(&user(7, "Alice"), &format!("/setme {long}")), bot.clone())
            .await;
        assert_eq!(
            bot.sent_texts(),
            ["The info needs to be under 1024 characters! You have 1025."]
        );
        assert!(env.context_for("userinfo").namespace().keys().is_empty());
    }

    #[tokio::test]
    async fn test_setbio_rules() {
        let env = env();
        let (_, dispatcher) = load(USERINFO, &env);
        let bot = RecordingBot::new("rose_bot");
        let alice = user(7, "Alice");
        let owner = user(99, "Owner");
        let me = user(1, "Rose");

        for (from, text, to) in [
            (&alice, "/setbio cool", &alice),
            (&alice, "/setbio cool", &owner),
            (&alice, "/setbio cool", &me),
            (&owner, "/setbio Friendly", &alice),
        ] {
            dispatcher
                .dispatch(group_reply(from, text, to), bot.clone())
                .await;
        }
        dispatcher
            .dispatch(group_message(&alice, "/setbio nobody"), bot.clone())
            .await;

        assert_eq!(
            bot.sent_texts(),
            [
                "Ha, you can't set your own bio! You're at the mercy of others here...",
                "You can't modify the owner's bio",
                "Only sudo users can update my bio.",
                "Updated Alice's bio!",
                "Reply to someone's message to set their bio!",
            ]
        );
    }

    #[tokio::test]
    async fn test_user_info_fragment() {
        let env = env();
        let (module, _) = load(USERINFO, &env);
        let ns = env.context_for("userinfo").namespace();
        let fragment = module.user_info_fn().unwrap();

        assert_eq!(fragment(UserId(7)).await.unwrap(), "");

        ns.set("bio:7", "Friendly").unwrap();
        assert_eq!(
            fragment(UserId(7)).await.unwrap(),
            "*What others say:*\nFriendly"
        );

        ns.set("me:7", "I like tea").unwrap();
        assert_eq!(
            fragment(UserId(7)).await.unwrap(),
            "*About user:*\nI like tea\n\n*What others say:*\nFriendly"
        );
    }
}
