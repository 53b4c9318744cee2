use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tower::BoxError;

use crate::capability::Capability;
use crate::matcher::Matcher;
use rose_core::{ChatId, UserId};

// ─── Callback slots ───────────────────────────────────────────────────────────

/// Re-keys a module's persisted data from the old chat id to the new one.
pub type MigrateFn =
    Arc<dyn Fn(ChatId, ChatId) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Returns one line for the `/stats` report.
pub type StatsFn = Arc<dyn Fn() -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync>;

/// Returns a profile fragment about a user; `""` contributes nothing.
pub type UserInfoFn =
    Arc<dyn Fn(UserId) -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync>;

/// Returns the module's settings for `(chat, requesting user)`.
pub type ChatSettingsFn =
    Arc<dyn Fn(ChatId, UserId) -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync>;

/// Returns the module's settings for a user.
pub type UserSettingsFn =
    Arc<dyn Fn(UserId) -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync>;

/// Restores the module's data for a chat from a backup section.
pub type ImportFn =
    Arc<dyn Fn(ChatId, Value) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Produces the module's backup section for a chat.
pub type ExportFn =
    Arc<dyn Fn(ChatId) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

#[derive(Clone, Default)]
struct Callbacks {
    migrate: Option<MigrateFn>,
    stats: Option<StatsFn>,
    user_info: Option<UserInfoFn>,
    chat_settings: Option<ChatSettingsFn>,
    user_settings: Option<UserSettingsFn>,
    import_data: Option<ImportFn>,
    export_data: Option<ExportFn>,
}

// ─── Module ───────────────────────────────────────────────────────────────────

/// A live command module.
///
/// Every capability is an explicit optional slot: a module participates in a
/// capability exactly when the slot is set.  Help is the exception, it is
/// present when the help text is non-empty.
///
/// ```rust,ignore
/// let ns = ctx.namespace();
/// Module::new("rules")
///     .display_name("Rules")
///     .help(" - /rules: get the rules for this chat.")
///     .matcher(on_command("rules").handler(get_rules))
///     .on_migrate(move |old, new| {
///         let ns = ns.clone();
///         async move { ns.rename(&old.to_string(), &new.to_string()).map(|_| ()) }
///     })
/// ```
#[derive(Clone)]
pub struct Module {
    id: String,
    display_name: Option<String>,
    help: Option<String>,
    matchers: Vec<Matcher>,
    callbacks: Callbacks,
}

impl Module {
    /// Creates an empty module with the given catalog identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            help: None,
            matchers: Vec::new(),
            callbacks: Callbacks::default(),
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    /// Adds a matcher; matchers are registered in the order they are added.
    pub fn matcher(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn on_migrate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ChatId, ChatId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.callbacks.migrate = Some(Arc::new(move |old, new| f(old, new).boxed()));
        self
    }

    pub fn on_stats<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        self.callbacks.stats = Some(Arc::new(move || f().boxed()));
        self
    }

    pub fn on_user_info<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(UserId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        self.callbacks.user_info = Some(Arc::new(move |user| f(user).boxed()));
        self
    }

    pub fn on_chat_settings<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ChatId, UserId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        self.callbacks.chat_settings = Some(Arc::new(move |chat, user| f(chat, user).boxed()));
        self
    }

    pub fn on_user_settings<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(UserId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        self.callbacks.user_settings = Some(Arc::new(move |user| f(user).boxed()));
        self
    }

    pub fn on_import<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ChatId, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.callbacks.import_data = Some(Arc::new(move |chat, data| f(chat, data).boxed()));
        self
    }

    pub fn on_export<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ChatId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.callbacks.export_data = Some(Arc::new(move |chat| f(chat).boxed()));
        self
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    /// The catalog identifier this module was created under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, defaulting to the catalog identifier.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Registry key: the lowercased display name.
    pub fn canonical_key(&self) -> String {
        self.name().to_lowercase()
    }

    /// Help text, or `None` when the module has none.
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref().filter(|h| !h.trim().is_empty())
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn migrate_fn(&self) -> Option<&MigrateFn> {
        self.callbacks.migrate.as_ref()
    }

    pub fn stats_fn(&self) -> Option<&StatsFn> {
        self.callbacks.stats.as_ref()
    }

    pub fn user_info_fn(&self) -> Option<&UserInfoFn> {
        self.callbacks.user_info.as_ref()
    }

    pub fn chat_settings_fn(&self) -> Option<&ChatSettingsFn> {
        self.callbacks.chat_settings.as_ref()
    }

    pub fn user_settings_fn(&self) -> Option<&UserSettingsFn> {
        self.callbacks.user_settings.as_ref()
    }

    pub fn import_fn(&self) -> Option<&ImportFn> {
        self.callbacks.import_data.as_ref()
    }

    pub fn export_fn(&self) -> Option<&ExportFn> {
        self.callbacks.export_data.as_ref()
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Help => self.help_text().is_some(),
            Capability::Migrate => self.callbacks.migrate.is_some(),
            Capability::Stats => self.callbacks.stats.is_some(),
            Capability::UserInfo => self.callbacks.user_info.is_some(),
            Capability::ImportData => self.callbacks.import_data.is_some(),
            Capability::ExportData => self.callbacks.export_data.is_some(),
            Capability::ChatSettings => self.callbacks.chat_settings.is_some(),
            Capability::UserSettings => self.callbacks.user_settings.is_some(),
        }
    }

    /// Every capability this module declares.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.has(*c))
            .collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("matchers", &self.matchers.len())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
