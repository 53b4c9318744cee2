//! Handlers the runtime registers on top of the modules' own matchers.
//!
//! Every handler reads the frozen [`Registry`]; none of them mutate it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use rose_core::{ApiError, ApiResult, ChatId, InlineButton, InlineKeyboard, User, UserId};
use rose_framework::presenter::help::DEFAULT_HELP_INTRO;
use rose_framework::presenter::{
    HelpAction, HelpLayout, MODULE_UNAVAILABLE, PageCursor, SettingsAction, module_help_keyboard,
    render_chat_settings_menu, render_help_page, render_module_help, render_module_settings,
    render_settings_summary, render_user_settings,
};
use rose_framework::{
    AccessControl, BoxError, Matcher, Registry, UpdateContext, collect_stats, collect_user_info,
    export_chat, import_chat, on_callback, on_chat_migrated, on_command, on_migration,
};

use crate::config::RoseConfig;

pub const DONATE_TEXT: &str = "Support my development!\n\
Server costs add up - your donations help keep me running.\n\n\
All contributions directly support server costs and improvements.";

const NOT_ADMIN: &str = "You need to be an admin to do this.";

type HandlerResult = Result<(), BoxError>;

/// Shared state of the core handlers.
pub(crate) struct Core {
    registry: Arc<Registry>,
    access: Arc<AccessControl>,
    layout: HelpLayout,
    settings_columns: usize,
    timeout: Duration,
    bot_name: String,
    donation_link: Option<String>,
}

impl Core {
    pub(crate) fn new(
        config: &RoseConfig,
        registry: Arc<Registry>,
        access: Arc<AccessControl>,
    ) -> Self {
        let mut intro = DEFAULT_HELP_INTRO.to_string();
        if config.bot.allow_excl {
            intro.push_str("\n\nAll commands work with `/` or `!`.");
        }
        Self {
            registry,
            access,
            layout: config.help.layout().with_intro(intro),
            settings_columns: config.help.columns,
            timeout: config.callbacks.timeout(),
            bot_name: config.bot.name.clone(),
            donation_link: config.bot.donation_link.clone(),
        }
    }

    /// Every core matcher, ready to hand to the dispatcher.
    pub(crate) fn matchers(self: Arc<Self>) -> Vec<Matcher> {
        let access = Arc::clone(&self.access);
        vec![
            on_migration()
                .group(i32::MIN)
                .block(true)
                .handler(bind(&self, Self::migrate)),
            on_command("start").handler(bind(&self, Self::start)),
            on_command("help").handler(bind(&self, Self::help)),
            on_callback(HelpAction::PREFIX).handler(bind(&self, Self::help_button)),
            on_command("settings").handler(bind(&self, Self::settings)),
            on_callback(SettingsAction::PREFIX).handler(bind(&self, Self::settings_button)),
            on_command("stats")
                .filter(move |ctx| ctx.sender_id().is_some_and(|u| access.is_sudo(u)))
                .handler(bind(&self, Self::stats)),
            on_command("info").handler(bind(&self, Self::info)),
            on_command("export")
                .group_only()
                .handler(bind(&self, Self::export)),
            on_command("import")
                .group_only()
                .handler(bind(&self, Self::import)),
            on_command("donate").handler(bind(&self, Self::donate)),
        ]
    }

    // ─── Start / help ─────────────────────────────────────────────────────────

    async fn start(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        if !ctx.is_private() {
            ctx.reply("Hey there! I'm alive :3").await?;
            return Ok(());
        }

        let arg = ctx.args().first().map(|a| a.to_lowercase());
        match arg.as_deref() {
            Some("help") => self.send_help_root(&ctx).await,
            Some(arg) if arg.starts_with("stngs_") => {
                match arg.trim_start_matches("stngs_").parse::<ChatId>() {
                    Ok(chat) => self.send_chat_settings(&ctx, chat).await,
                    Err(_) => self.send_start(&ctx).await,
                }
            }
            _ => self.send_start(&ctx).await,
        }
    }

    async fn send_start(&self, ctx: &UpdateContext) -> HandlerResult {
        let text = format!(
            "Hey there! I'm {} - your group management assistant. \
             Use /help to discover my full capabilities.",
            self.bot_name
        );
        let keyboard = InlineKeyboard::new().row(vec![
            InlineButton::url(
                "Add To Group",
                format!("https://t.me/{}?startgroup=true", ctx.bot().username()),
            ),
            InlineButton::callback("Help", HelpAction::Back.to_callback_data()),
        ]);
        ctx.reply_with(&text, keyboard).await?;
        Ok(())
    }

    async fn send_help_root(&self, ctx: &UpdateContext) -> HandlerResult {
        let page = render_help_page(0, self.registry.helpable(), &self.layout);
        ctx.reply_with(&page.text, page.keyboard).await?;
        Ok(())
    }

    async fn help(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        if !ctx.is_private() {
            let keyboard = InlineKeyboard::new().row(vec![InlineButton::url(
                "Help",
                format!("https://t.me/{}?start=help", ctx.bot().username()),
            )]);
            ctx.reply_with("Contact me in PM for commands:", keyboard)
                .await?;
            return Ok(());
        }

        let module_help = ctx
            .args()
            .first()
            .and_then(|key| render_module_help(&key.to_lowercase(), self.registry.helpable()).ok());
        match module_help {
            Some(text) => {
                ctx.reply_with(&text, module_help_keyboard()).await?;
                Ok(())
            }
            None => self.send_help_root(&ctx).await,
        }
    }

    async fn help_button(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        let Some(action) = HelpAction::parse(ctx.callback_data()) else {
            debug!(data = ctx.callback_data(), "Unrecognised help callback");
            ctx.answer(None).await?;
            return Ok(());
        };

        let helpable = self.registry.helpable();
        let mut notice = None;
        let (text, keyboard) = match &action {
            HelpAction::Module(key) => match render_module_help(key, helpable) {
                Ok(text) => (text, module_help_keyboard()),
                Err(err) => {
                    debug!(error = %err, "Stale help button");
                    notice = Some(MODULE_UNAVAILABLE);
                    let page = render_help_page(0, helpable, &self.layout);
                    (page.text, page.keyboard)
                }
            },
            nav => {
                let cursor = PageCursor::after(nav).unwrap_or_default();
                let page = render_help_page(cursor.page_index, helpable, &self.layout);
                (page.text, page.keyboard)
            }
        };

        tolerate_unmodified(ctx.edit_or_reply(&text, Some(keyboard)).await)?;
        ctx.answer(notice).await?;
        Ok(())
    }

    // ─── Settings ─────────────────────────────────────────────────────────────

    async fn settings(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        let (Some(chat), Some(user)) = (ctx.chat_id(), ctx.sender_id()) else {
            return Ok(());
        };

        if ctx.is_private() {
            let summary = render_user_settings(user, &self.registry, self.timeout).await;
            let text = if summary.is_empty() {
                "There aren't any user specific settings available :'(".to_string()
            } else {
                format!("These are your current settings:\n\n{summary}")
            };
            ctx.reply(&text).await?;
            return Ok(());
        }

        if !ctx.sender_is_admin().await? {
            ctx.reply(NOT_ADMIN).await?;
            return Ok(());
        }
        let keyboard = InlineKeyboard::new().row(vec![InlineButton::url(
            "Settings",
            format!("https://t.me/{}?start=stngs_{chat}", ctx.bot().username()),
        )]);
        ctx.reply_with(
            "Click here to get this chat's settings, as well as yours.",
            keyboard,
        )
        .await?;
        Ok(())
    }

    /// Settings summary for `chat`, sent to the user's private chat; admins
    /// of `chat` also get the per-module menu.
    async fn send_chat_settings(&self, ctx: &UpdateContext, chat: ChatId) -> HandlerResult {
        let Some(user) = ctx.sender_id() else {
            return Ok(());
        };
        let title = self.chat_title(ctx, chat).await;
        let summary = render_settings_summary(chat, user, &self.registry, self.timeout).await;
        let text = if summary.is_empty() {
            format!("There are no settings for *{title}* yet.")
        } else {
            format!("These are the settings for *{title}*:\n\n{summary}")
        };

        if ctx.bot().is_chat_admin(chat, user).await? {
            let (_, keyboard) =
                render_chat_settings_menu(chat, &title, &self.registry, self.settings_columns);
            ctx.reply_with(&text, keyboard).await?;
        } else {
            ctx.reply(&text).await?;
        }
        Ok(())
    }

    async fn settings_button(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        let (Some(action), Some(user)) = (SettingsAction::parse(ctx.callback_data()), ctx.sender_id())
        else {
            ctx.answer(None).await?;
            return Ok(());
        };
        let chat = match &action {
            SettingsAction::Module { chat, .. } | SettingsAction::Back { chat } => *chat,
        };

        if !ctx.bot().is_chat_admin(chat, user).await? {
            ctx.answer(Some(NOT_ADMIN)).await?;
            return Ok(());
        }

        let title = self.chat_title(&ctx, chat).await;
        let mut notice = None;
        let (text, keyboard) = match &action {
            SettingsAction::Module { key, .. } => {
                match render_module_settings(chat, user, key, &self.registry, self.timeout).await {
                    Ok(rendered) => rendered,
                    Err(err) => {
                        debug!(error = %err, "Stale settings button");
                        notice = Some(MODULE_UNAVAILABLE);
                        render_chat_settings_menu(chat, &title, &self.registry, self.settings_columns)
                    }
                }
            }
            SettingsAction::Back { .. } => {
                render_chat_settings_menu(chat, &title, &self.registry, self.settings_columns)
            }
        };

        tolerate_unmodified(ctx.edit_or_reply(&text, Some(keyboard)).await)?;
        ctx.answer(notice).await?;
        Ok(())
    }

    async fn chat_title(&self, ctx: &UpdateContext, chat: ChatId) -> String {
        match ctx.bot().get_chat(chat).await {
            Ok(found) => found.display_title(),
            Err(err) => {
                debug!(chat = %chat, error = %err, "Chat lookup failed");
                chat.to_string()
            }
        }
    }

    // ─── Migration ────────────────────────────────────────────────────────────

    async fn migrate(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        ctx.stop_propagation();
        let Some((old, new)) = ctx.migration().and_then(|m| m.resolve()) else {
            return Ok(());
        };
        on_chat_migrated(old, new, self.registry.migrateable(), self.timeout).await;
        Ok(())
    }

    // ─── Stats / info ─────────────────────────────────────────────────────────

    async fn stats(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        let lines = collect_stats(self.registry.stats(), self.timeout).await;
        ctx.reply(&format!("Current stats:\n{}", lines.join("\n")))
            .await?;
        Ok(())
    }

    async fn info(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        let target = match ctx.args().first() {
            Some(arg) => match arg.parse::<UserId>() {
                Ok(id) => Target::Id(id),
                Err(_) => {
                    ctx.reply("I can't extract a user from this.").await?;
                    return Ok(());
                }
            },
            None => match ctx.replied().and_then(|m| m.from.clone()).or_else(|| ctx.sender().cloned()) {
                Some(user) => Target::User(user),
                None => return Ok(()),
            },
        };

        let fragments = collect_user_info(target.id(), self.registry.user_info(), self.timeout).await;
        let text = render_profile(&target, self.access.is_owner(target.id()), &fragments);
        ctx.reply(&text).await?;
        Ok(())
    }

    // ─── Import / export ──────────────────────────────────────────────────────

    async fn export(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        let Some(chat) = ctx.chat_id() else {
            return Ok(());
        };
        if !ctx.sender_is_admin().await? {
            ctx.reply(NOT_ADMIN).await?;
            return Ok(());
        }

        let document = export_chat(chat, self.registry.data_export(), self.timeout).await;
        let json = serde_json::to_string_pretty(&document)?;
        ctx.reply(&format!("Here's this chat's backup:\n\n{json}"))
            .await?;
        Ok(())
    }

    async fn import(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        let Some(chat) = ctx.chat_id() else {
            return Ok(());
        };
        if !ctx.sender_is_admin().await? {
            ctx.reply(NOT_ADMIN).await?;
            return Ok(());
        }

        let raw = ctx.arg_text().trim();
        if raw.is_empty() {
            ctx.reply("Send the backup JSON along with /import.").await?;
            return Ok(());
        }
        let document = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(doc) if doc.is_object() => doc,
            _ => {
                ctx.reply("That doesn't look like a valid backup.").await?;
                return Ok(());
            }
        };

        let report = import_chat(chat, &document, self.registry.data_import(), self.timeout).await;
        info!(
            chat = %chat,
            imported = report.imported.len(),
            failed = report.failures.len(),
            "Backup imported"
        );

        let mut text = format!("Backup imported! Restored: {}.", list_or_none(&report.imported));
        if !report.failures.is_empty() {
            let failed: Vec<String> = report
                .failures
                .iter()
                .map(|e| e.module().to_string())
                .collect();
            text.push_str(&format!("\nCouldn't restore: {}.", failed.join(", ")));
        }
        ctx.reply(&text).await?;
        Ok(())
    }

    async fn donate(self: Arc<Self>, ctx: Arc<UpdateContext>) -> HandlerResult {
        let text = match &self.donation_link {
            Some(link) => format!(
                "{DONATE_TEXT}\n\nYou can also support the person currently running me [here]({link})."
            ),
            None => DONATE_TEXT.to_string(),
        };
        ctx.reply(&text).await?;
        Ok(())
    }
}

/// Adapts a `Core` method into a handler closure.
fn bind<F, Fut>(
    core: &Arc<Core>,
    f: F,
) -> impl Fn(Arc<UpdateContext>) -> Fut + Clone + Send + Sync + 'static
where
    F: Fn(Arc<Core>, Arc<UpdateContext>) -> Fut + Clone + Send + Sync + 'static,
{
    let core = Arc::clone(core);
    move |ctx| f(Arc::clone(&core), ctx)
}

/// Editing a message to its current content is not an error.
fn tolerate_unmodified(result: ApiResult<()>) -> HandlerResult {
    match result {
        Err(ApiError::NotModified) => Ok(()),
        other => other.map_err(Into::into),
    }
}

fn list_or_none(keys: &[String]) -> String {
    if keys.is_empty() {
        "nothing".to_string()
    } else {
        keys.join(", ")
    }
}

/// Whose profile `/info` shows.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// A user the update carries full details for.
    User(User),
    /// Only an id was given.
    Id(UserId),
}

impl Target {
    fn id(&self) -> UserId {
        match self {
            Self::User(user) => user.id,
            Self::Id(id) => *id,
        }
    }
}

fn render_profile(target: &Target, is_owner: bool, fragments: &[String]) -> String {
    let mut text = format!("*User info*:\nID: `{}`", target.id());
    if let Target::User(user) = target {
        text.push_str(&format!("\nFirst Name: {}", user.first_name));
        if let Some(username) = &user.username {
            text.push_str(&format!("\nUsername: @{username}"));
        }
    }
    for fragment in fragments {
        text.push_str("\n\n");
        text.push_str(fragment);
    }
    if is_owner {
        text.push_str("\n\nThis person is my owner - I would never do anything against them!");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_layout() {
        let user = User::new(UserId(7), "Alice").with_username("alice");
        let text = render_profile(
            &Target::User(user),
            false,
            &["Bio: hi".to_string(), "Seen in 2 chats.".to_string()],
        );
        assert_eq!(
            text,
            "*User info*:\nID: `7`\nFirst Name: Alice\nUsername: @alice\n\nBio: hi\n\nSeen in 2 chats."
        );
    }

    #[test]
    fn test_profile_by_id_for_owner() {
        let text = render_profile(&Target::Id(UserId(42)), true, &[]);
        assert!(text.starts_with("*User info*:\nID: `42`"));
        assert!(!text.contains("First Name"));
        assert!(text.ends_with("I would never do anything against them!"));
    }

    #[test]
    fn test_unmodified_edits_are_ignored() {
        assert!(tolerate_unmodified(Err(ApiError::NotModified)).is_ok());
        assert!(tolerate_unmodified(Err(ApiError::Timeout)).is_err());
    }
}
