//! Warnings with a per-chat limit.
//!
//! Reaching the limit resets the user's count and either kicks (the default,
//! "soft" warn) or bans them.
//!
//! Keys: `<chat>` holds the chat's [`WarnSettings`], `<chat>:<user>` holds a
//! [`WarnRecord`].

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use rose_core::{ChatId, InlineButton, InlineKeyboard, UserId};
use rose_framework::{
    BoxError, Module, ModuleContext, ModuleDescriptor, Namespace, UpdateContext, on_callback,
    on_command, on_commands,
};

use crate::helpers::{NOT_ADMIN, bind, ensure_admin, extract_user, extract_user_and_text};

pub const WARNS: ModuleDescriptor = ModuleDescriptor::new("warns", create);

/// Lowest limit a chat may configure.
pub const MIN_WARN_LIMIT: u32 = 3;

/// Reasons listed when a user hits the limit.
const MAX_LISTED_REASONS: usize = 10;

const RM_WARN_PREFIX: &str = "rm_warn_";

const HELP: &str = " - /warns <userhandle>: get a user's number, and reason, of warnings.

*Admin only:*
 - /warn <userhandle> [reason]: warn a user. After the limit, they'll be kicked from the group. \
Can also be used as a reply.
 - /resetwarns <userhandle>: reset the warnings for a user. Can also be used as a reply.
 - /warnlimit <num>: set the warning limit.
 - /warnaction <ban/kick>: what happens when a user reaches the limit.";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct WarnsConfig {
    default_limit: u32,
    soft_warn: bool,
}

impl Default for WarnsConfig {
    fn default() -> Self {
        Self {
            default_limit: MIN_WARN_LIMIT,
            soft_warn: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarnSettings {
    pub limit: u32,
    /// Kick rather than ban.
    pub soft: bool,
}

impl WarnSettings {
    fn verb(&self) -> &'static str {
        if self.soft { "kicked" } else { "banned" }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarnRecord {
    pub count: u32,
    pub reasons: Vec<String>,
}

// ─── Storage ──────────────────────────────────────────────────────────────────

struct WarnStore {
    ns: Namespace,
    defaults: WarnSettings,
    /// Serializes read-modify-write cycles on warn records.
    lock: Mutex<()>,
}

fn user_key(chat: ChatId, user: UserId) -> String {
    format!("{chat}:{user}")
}

impl WarnStore {
    fn settings(&self, chat: ChatId) -> Result<WarnSettings, BoxError> {
        Ok(self.ns.get(&chat.to_string())?.unwrap_or(self.defaults))
    }

    fn set_settings(&self, chat: ChatId, settings: WarnSettings) -> Result<(), BoxError> {
        Ok(self.ns.set(&chat.to_string(), &settings)?)
    }

    fn record(&self, chat: ChatId, user: UserId) -> Result<WarnRecord, BoxError> {
        Ok(self.ns.get(&user_key(chat, user))?.unwrap_or_default())
    }

    fn add(&self, chat: ChatId, user: UserId, reason: &str) -> Result<WarnRecord, BoxError> {
        let _guard = self.lock.lock();
        let mut record = self.record(chat, user)?;
        record.count += 1;
        if !reason.is_empty() {
            record.reasons.push(reason.to_string());
        }
        self.ns.set(&user_key(chat, user), &record)?;
        Ok(record)
    }

    /// Removes the most recent warning; `false` if there was none.
    fn remove_one(&self, chat: ChatId, user: UserId) -> Result<bool, BoxError> {
        let _guard = self.lock.lock();
        let mut record = self.record(chat, user)?;
        if record.count == 0 {
            return Ok(false);
        }
        record.count -= 1;
        record.reasons.truncate(record.count as usize);
        if record.count == 0 {
            self.ns.remove(&user_key(chat, user));
        } else {
            self.ns.set(&user_key(chat, user), &record)?;
        }
        Ok(true)
    }

    fn reset(&self, chat: ChatId, user: UserId) {
        let _guard = self.lock.lock();
        self.ns.remove(&user_key(chat, user));
    }

    /// `(total warnings, chats with any)`.
    fn totals(&self) -> Result<(u64, usize), BoxError> {
        let mut warns = 0u64;
        let mut chats = std::collections::BTreeSet::new();
        for key in self.ns.keys() {
            let Some((chat, _)) = key.split_once(':') else {
                continue;
            };
            let record: WarnRecord = self.ns.get(&key)?.unwrap_or_default();
            if record.count > 0 {
                warns += u64::from(record.count);
                chats.insert(chat.to_string());
            }
        }
        Ok((warns, chats.len()))
    }

    fn migrate(&self, old: ChatId, new: ChatId) {
        let _guard = self.lock.lock();
        self.ns.rename(&old.to_string(), &new.to_string());
        let moved = self.ns.rename_prefix(&format!("{old}:"), &format!("{new}:"));
        info!(old_chat = %old, new_chat = %new, records = moved, "Migrated warnings");
    }
}

struct Warns {
    store: WarnStore,
    users: Namespace,
}

fn create(ctx: &ModuleContext) -> Result<Module, BoxError> {
    let config: WarnsConfig = ctx.get_config()?;
    if config.default_limit < MIN_WARN_LIMIT {
        return Err(format!("default_limit must be at least {MIN_WARN_LIMIT}").into());
    }

    let warns = Arc::new(Warns {
        store: WarnStore {
            ns: ctx.namespace(),
            defaults: WarnSettings {
                limit: config.default_limit,
                soft: config.soft_warn,
            },
            lock: Mutex::new(()),
        },
        users: ctx.namespace_named("users"),
    });

    let module = Module::new("warns")
        .display_name("Warnings")
        .help(HELP)
        .matcher(on_command("warn").group_only().handler(bind(&warns, warn)))
        .matcher(on_command("warns").group_only().handler(bind(&warns, show_warns)))
        .matcher(
            on_commands(&["resetwarn", "resetwarns"])
                .group_only()
                .handler(bind(&warns, reset_warns)),
        )
        .matcher(on_command("warnlimit").group_only().handler(bind(&warns, set_limit)))
        .matcher(on_command("warnaction").group_only().handler(bind(&warns, set_action)))
        .matcher(on_callback(RM_WARN_PREFIX).handler(bind(&warns, remove_warn)));

    let module = module
        .on_migrate({
            let warns = Arc::clone(&warns);
            move |old, new| {
                let warns = Arc::clone(&warns);
                async move {
                    warns.store.migrate(old, new);
                    Ok(())
                }
            }
        })
        .on_stats({
            let warns = Arc::clone(&warns);
            move || {
                let warns = Arc::clone(&warns);
                async move {
                    let (count, chats) = warns.store.totals()?;
                    Ok(format!("{count} overall warns, across {chats} chats."))
                }
            }
        })
        .on_chat_settings(move |chat, _user| {
            let warns = Arc::clone(&warns);
            async move {
                let settings = warns.store.settings(chat)?;
                Ok(format!(
                    "It takes `{}` warns before the user gets *{}*.",
                    settings.limit,
                    settings.verb()
                ))
            }
        });

    Ok(module)
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn warn(warns: Arc<Warns>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let Some(chat) = ctx.chat_id() else {
        return Ok(());
    };
    let Some((target, reason)) = extract_user_and_text(&ctx, &warns.users) else {
        ctx.reply("No user was designated!").await?;
        return Ok(());
    };
    if target.id == ctx.bot().id() {
        ctx.reply("I'm not going to warn myself!").await?;
        return Ok(());
    }
    if ctx.bot().is_chat_admin(chat, target.id).await? {
        ctx.reply("Admins can't be warned!").await?;
        return Ok(());
    }

    let settings = warns.store.settings(chat)?;
    let record = warns.store.add(chat, target.id, &reason)?;
    let name = target.display_name();

    if record.count >= settings.limit {
        warns.store.reset(chat, target.id);
        if settings.soft {
            ctx.bot().unban_member(chat, target.id).await?;
        } else {
            ctx.bot().ban_member(chat, target.id).await?;
        }
        info!(chat = %chat, user = %target.id, limit = settings.limit, "Warn limit reached");

        let text = format!(
            "{name} has been {} for reaching {} warnings!{}",
            settings.verb(),
            settings.limit,
            list_reasons(&record.reasons)
        );
        ctx.reply(&text).await?;
        return Ok(());
    }

    let warner = ctx
        .sender()
        .map(|u| u.first_name.clone())
        .unwrap_or_default();
    let mut text = format!(
        "{name} has been warned by {warner}\nWarnings: {}/{}",
        record.count, settings.limit
    );
    if !reason.is_empty() {
        text.push_str(&format!("\nReason: {reason}"));
    }
    let keyboard = InlineKeyboard::new().row(vec![InlineButton::callback(
        "Remove warn",
        format!("{RM_WARN_PREFIX}{}", target.id),
    )]);
    ctx.reply_with(&text, keyboard).await?;
    Ok(())
}

fn list_reasons(reasons: &[String]) -> String {
    let mut out = String::new();
    for reason in reasons.iter().take(MAX_LISTED_REASONS) {
        out.push_str(&format!("\n - {reason}"));
    }
    if reasons.len() > MAX_LISTED_REASONS {
        out.push_str(&format!(
            "\n...and {} more",
            reasons.len() - MAX_LISTED_REASONS
        ));
    }
    out
}

async fn show_warns(warns: Arc<Warns>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let Some(chat) = ctx.chat_id() else {
        return Ok(());
    };
    let user = match extract_user(&ctx, &warns.users) {
        Some(target) => target.id,
        None => match ctx.sender_id() {
            Some(id) => id,
            None => return Ok(()),
        },
    };

    let settings = warns.store.settings(chat)?;
    let record = warns.store.record(chat, user)?;
    let text = if record.count == 0 {
        "This user has no warnings!".to_string()
    } else if record.reasons.is_empty() {
        format!(
            "User has {}/{} warnings, but no reasons for any of them.",
            record.count, settings.limit
        )
    } else {
        format!(
            "This user has {}/{} warnings, for the following reasons:{}",
            record.count,
            settings.limit,
            list_reasons(&record.reasons)
        )
    };
    ctx.reply(&text).await?;
    Ok(())
}

async fn reset_warns(warns: Arc<Warns>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let (Some(chat), Some(target)) = (ctx.chat_id(), extract_user(&ctx, &warns.users)) else {
        ctx.reply("No user has been designated!").await?;
        return Ok(());
    };
    warns.store.reset(chat, target.id);
    ctx.reply("Warnings have been reset!").await?;
    Ok(())
}

async fn set_limit(warns: Arc<Warns>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let Some(chat) = ctx.chat_id() else {
        return Ok(());
    };
    let mut settings = warns.store.settings(chat)?;

    let Some(arg) = ctx.args().first().copied() else {
        ctx.reply(&format!("Current warning limit: {}", settings.limit))
            .await?;
        return Ok(());
    };
    let Ok(limit) = arg.parse::<u32>() else {
        ctx.reply("Give me a number as an arg!").await?;
        return Ok(());
    };
    if limit < MIN_WARN_LIMIT {
        ctx.reply(&format!("Minimum warn limit is {MIN_WARN_LIMIT}!"))
            .await?;
        return Ok(());
    }

    settings.limit = limit;
    warns.store.set_settings(chat, settings)?;
    ctx.reply(&format!("Updated the warn limit to {limit}")).await?;
    Ok(())
}

async fn set_action(warns: Arc<Warns>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    let Some(chat) = ctx.chat_id() else {
        return Ok(());
    };
    let mut settings = warns.store.settings(chat)?;

    let arg = ctx.args().first().map(|a| a.to_lowercase());
    let soft = match arg.as_deref() {
        None => {
            ctx.reply(&format!(
                "Users are currently {} when they reach the warn limit.",
                settings.verb()
            ))
            .await?;
            return Ok(());
        }
        Some("on" | "yes" | "ban") => false,
        Some("off" | "no" | "kick") => true,
        Some(_) => {
            ctx.reply("I only understand ban/kick (or on/off)!").await?;
            return Ok(());
        }
    };

    settings.soft = soft;
    warns.store.set_settings(chat, settings)?;
    let text = if soft {
        "Too many warns will now result in a kick! Users will be able to join again after."
    } else {
        "Too many warns will now result in a ban!"
    };
    ctx.reply(text).await?;
    Ok(())
}

async fn remove_warn(warns: Arc<Warns>, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    if !ctx.sender_is_admin().await? {
        ctx.answer(Some(NOT_ADMIN)).await?;
        return Ok(());
    }
    let (Some(chat), Ok(user)) = (
        ctx.chat_id(),
        ctx.callback_data()
            .trim_start_matches(RM_WARN_PREFIX)
            .parse::<UserId>(),
    ) else {
        ctx.answer(None).await?;
        return Ok(());
    };

    if warns.store.remove_one(chat, user)? {
        let admin = ctx
            .sender()
            .map(|u| u.first_name.clone())
            .unwrap_or_default();
        ctx.edit_or_reply(&format!("Warn removed by {admin}."), None)
            .await?;
        ctx.answer(Some("Warn removed!")).await?;
    } else {
        ctx.answer(Some("No warn to remove!")).await?;
    }
    Ok(())
}
