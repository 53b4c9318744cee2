//! Help and settings presentation over the registry's capability maps.

pub mod help;
pub mod settings;

pub use help::{
    HelpAction, HelpLayout, HelpPage, MODULE_UNAVAILABLE, PageCursor, module_help_keyboard,
    render_help_page, render_module_help,
};
pub use settings::{
    SettingsAction, render_chat_settings_menu, render_module_settings, render_settings_summary,
    render_user_settings,
};
