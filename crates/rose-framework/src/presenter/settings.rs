//! Per-chat and per-user settings.

use std::time::Duration;

use rose_core::{ChatId, InlineButton, InlineKeyboard, UserId};

use super::help::wrapped;
use crate::aggregate::{invoke, log_skipped};
use crate::capability::Capability;
use crate::error::NotFound;
use crate::registry::Registry;

/// A settings-menu button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    /// Show one module's settings for a chat.
    Module { chat: ChatId, key: String },
    /// Back to the chat's module list.
    Back { chat: ChatId },
}

impl SettingsAction {
    pub const PREFIX: &'static str = "stngs_";

    pub fn parse(data: &str) -> Option<Self> {
        if let Some(inner) = wrapped(data, "stngs_module") {
            let (chat, key) = inner.split_once(',')?;
            return Some(Self::Module {
                chat: chat.parse().ok()?,
                key: key.to_string(),
            });
        }
        let chat = wrapped(data, "stngs_back")?;
        Some(Self::Back {
            chat: chat.parse().ok()?,
        })
    }

    pub fn to_callback_data(&self) -> String {
        match self {
            Self::Module { chat, key } => format!("stngs_module({chat},{key})"),
            Self::Back { chat } => format!("stngs_back({chat})"),
        }
    }
}

fn entry(name: &str, text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| format!("*{name}*:\n{text}"))
}

/// Every chat-settings module's summary for `chat`, followed by every
/// user-settings module's summary for `user`, in registry order.
///
/// Modules returning an empty string (or failing) contribute nothing.
pub async fn render_settings_summary(
    chat: ChatId,
    user: UserId,
    registry: &Registry,
    timeout: Duration,
) -> String {
    let mut parts = Vec::new();
    for module in registry.chat_settings().modules() {
        let Some(settings) = module.chat_settings_fn() else {
            continue;
        };
        match invoke(module, Capability::ChatSettings, timeout, settings(chat, user)).await {
            Ok(text) => parts.extend(entry(module.name(), &text)),
            Err(err) => log_skipped(&err),
        }
    }
    parts.push(render_user_settings(user, registry, timeout).await);
    parts.retain(|p| !p.is_empty());
    parts.join("\n\n")
}

/// Every user-settings module's summary for `user`.
pub async fn render_user_settings(user: UserId, registry: &Registry, timeout: Duration) -> String {
    let mut parts = Vec::new();
    for module in registry.user_settings().modules() {
        let Some(settings) = module.user_settings_fn() else {
            continue;
        };
        match invoke(module, Capability::UserSettings, timeout, settings(user)).await {
            Ok(text) => parts.extend(entry(module.name(), &text)),
            Err(err) => log_skipped(&err),
        }
    }
    parts.join("\n\n")
}

/// Menu of chat-settings modules for `chat`, one button per module.
pub fn render_chat_settings_menu(
    chat: ChatId,
    chat_title: &str,
    registry: &Registry,
    columns: usize,
) -> (String, InlineKeyboard) {
    if registry.chat_settings().is_empty() {
        return (
            "There are no chat settings available :'(".to_string(),
            InlineKeyboard::new(),
        );
    }

    let buttons: Vec<InlineButton> = registry
        .chat_settings()
        .iter()
        .map(|(key, module)| {
            InlineButton::callback(
                module.name(),
                SettingsAction::Module {
                    chat,
                    key: key.to_string(),
                }
                .to_callback_data(),
            )
        })
        .collect();

    let mut keyboard = InlineKeyboard::new();
    for row in buttons.chunks(columns.max(1)) {
        keyboard.push_row(row.to_vec());
    }
    let text = format!("Hi there! There are quite a few settings for *{chat_title}* - go ahead and pick what you're interested in.");
    (text, keyboard)
}

/// One module's settings for `chat`, with a Back button to the menu.
pub async fn render_module_settings(
    chat: ChatId,
    user: UserId,
    key: &str,
    registry: &Registry,
    timeout: Duration,
) -> Result<(String, InlineKeyboard), NotFound> {
    let module = registry
        .chat_settings()
        .get(key)
        .ok_or_else(|| NotFound::new(key))?;
    let settings = module.chat_settings_fn().ok_or_else(|| NotFound::new(key))?;

    let body = match invoke(module, Capability::ChatSettings, timeout, settings(chat, user)).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => "Nothing configured yet.".to_string(),
        Err(err) => {
            log_skipped(&err);
            "These settings are unavailable right now.".to_string()
        }
    };

    let keyboard = InlineKeyboard::new().row(vec![InlineButton::callback(
        "Back",
        SettingsAction::Back { chat }.to_callback_data(),
    )]);
    Ok((format!("*{}* module settings:\n\n{body}", module.name()), keyboard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, ModuleCatalog, ModuleContext, ModuleDescriptor, ModuleEnv};
    use tower::BoxError;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn rules(_: &ModuleContext) -> Result<Module, BoxError> {
        Ok(Module::new("rules")
            .display_name("Rules")
            .on_chat_settings(|chat, _| async move { Ok(format!("Rules set for {chat}: true")) }))
    }

    fn locks(_: &ModuleContext) -> Result<Module, BoxError> {
        Ok(Module::new("locks").on_chat_settings(|_, _| async { Ok(String::new()) }))
    }

    fn warns(_: &ModuleContext) -> Result<Module, BoxError> {
        Ok(Module::new("warns")
            .display_name("Warnings")
            .on_chat_settings(|_, _| async { Ok("Limit: 3".to_string()) }))
    }

    fn privacy(_: &ModuleContext) -> Result<Module, BoxError> {
        Ok(Module::new("privacy")
            .display_name("Privacy")
            .on_user_settings(|user| async move { Ok(format!("Tracking {user}: off")) }))
    }

    fn registry() -> Registry {
        let catalog = ModuleCatalog::new([
            ModuleDescriptor::new("rules", rules),
            ModuleDescriptor::new("locks", locks),
            ModuleDescriptor::new("warns", warns),
            ModuleDescriptor::new("privacy", privacy),
        ]);
        Registry::load_all(
            &["rules", "locks", "warns", "privacy"],
            &catalog,
            &ModuleEnv::default(),
        )
    }

    #[test]
    fn test_action_roundtrip() {
        for action in [
            SettingsAction::Module {
                chat: ChatId(-100),
                key: "black out".into(),
            },
            SettingsAction::Back { chat: ChatId(-100) },
        ] {
            assert_eq!(SettingsAction::parse(&action.to_callback_data()), Some(action));
        }
        assert_eq!(SettingsAction::parse("stngs_back(abc)"), None);
        assert_eq!(SettingsAction::parse("help_back"), None);
    }

    #[tokio::test]
    async fn test_summary_skips_empty_entries() {
        let text = render_settings_summary(ChatId(-100), UserId(7), &registry(), TIMEOUT).await;
        assert_eq!(
            text,
            "*Rules*:\nRules set for -100: true\n\n*Warnings*:\nLimit: 3\n\n*Privacy*:\nTracking 7: off"
        );
    }

    #[tokio::test]
    async fn test_module_settings_and_stale_key() {
        let registry = registry();
        let (text, keyboard) =
            render_module_settings(ChatId(-100), UserId(7), "warnings", &registry, TIMEOUT)
                .await
                .unwrap();
        assert!(text.contains("Limit: 3"));
        assert_eq!(
            keyboard.find("Back").and_then(|b| b.callback_data()),
            Some("stngs_back(-100)")
        );

        let err = render_module_settings(ChatId(-100), UserId(7), "gone", &registry, TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err, NotFound::new("gone"));
    }

    #[test]
    fn test_menu_lists_chat_settings_modules() {
        let (_, keyboard) = render_chat_settings_menu(ChatId(-100), "Group", &registry(), 2);
        let labels: Vec<_> = keyboard.buttons().map(|b| b.text.as_str()).collect();
        assert_eq!(labels, ["Rules", "locks", "Warnings"]);
    }
}
