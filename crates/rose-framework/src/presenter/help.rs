//! Paginated help menu.
//!
//! The root help message lists the help-capable modules as buttons, a fixed
//! number per page, with navigation underneath:
//!
//! ```text
//! ┌──────────────┐
//! │    Rules     │   help_module(rules)
//! │   Warnings   │   help_module(warnings)
//! │     ...      │
//! ├────┬────┬────┤
//! │ <  │Back│ >  │   help_prev(1)  help_back  help_next(1)
//! └────┴────┴────┘
//! ```
//!
//! The page index travels inside the callback data; nothing is persisted.

use rose_core::{InlineButton, InlineKeyboard};

use crate::capability::CapabilityMap;
use crate::error::NotFound;

/// Shown when a help button refers to a module that is no longer loaded.
pub const MODULE_UNAVAILABLE: &str = "That module is no longer available.";

pub const DEFAULT_HELP_INTRO: &str = "Hi! I'm Rose, your group management bot. \
I help keep order with warnings, rules and more.\n\n\
*Essential commands:*\n\
 - /start: start the bot\n\
 - /help: show this message\n\
 - /donate: support my development\n\n\
Pick a module below for its commands.";

// ─── Callback data ────────────────────────────────────────────────────────────

/// A help-menu button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpAction {
    /// Show one module's help.
    Module(String),
    /// Go to the page before the given one.
    Prev(usize),
    /// Go to the page after the given one.
    Next(usize),
    /// Return to the first page.
    Back,
}

impl HelpAction {
    /// Every help callback starts with this prefix.
    pub const PREFIX: &'static str = "help_";

    pub fn parse(data: &str) -> Option<Self> {
        if data == "help_back" {
            return Some(Self::Back);
        }
        if let Some(key) = wrapped(data, "help_module") {
            return Some(Self::Module(key.to_string()));
        }
        if let Some(n) = wrapped(data, "help_prev") {
            return n.parse().ok().map(Self::Prev);
        }
        if let Some(n) = wrapped(data, "help_next") {
            return n.parse().ok().map(Self::Next);
        }
        None
    }

    pub fn to_callback_data(&self) -> String {
        match self {
            Self::Module(key) => format!("help_module({key})"),
            Self::Prev(n) => format!("help_prev({n})"),
            Self::Next(n) => format!("help_next({n})"),
            Self::Back => "help_back".to_string(),
        }
    }
}

/// Extracts `x` from `name(x)`.
pub(crate) fn wrapped<'a>(data: &'a str, name: &str) -> Option<&'a str> {
    data.strip_prefix(name)?.strip_prefix('(')?.strip_suffix(')')
}

// ─── Pagination ───────────────────────────────────────────────────────────────

/// Position in the help menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub page_index: usize,
}

impl PageCursor {
    pub fn new(page_index: usize) -> Self {
        Self { page_index }
    }

    /// The cursor a help action leads to; `None` for [`HelpAction::Module`].
    pub fn after(action: &HelpAction) -> Option<Self> {
        match action {
            HelpAction::Prev(n) => Some(Self::new(n.saturating_sub(1))),
            HelpAction::Next(n) => Some(Self::new(n.saturating_add(1))),
            HelpAction::Back => Some(Self::default()),
            HelpAction::Module(_) => None,
        }
    }
}

/// How the help menu is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpLayout {
    /// Module buttons per page.
    pub page_size: usize,
    /// Module buttons per row.
    pub columns: usize,
    /// Text shown above the buttons.
    pub intro: String,
}

impl Default for HelpLayout {
    fn default() -> Self {
        Self {
            page_size: 5,
            columns: 1,
            intro: DEFAULT_HELP_INTRO.to_string(),
        }
    }
}

impl HelpLayout {
    pub fn new(page_size: usize, columns: usize) -> Self {
        Self {
            page_size,
            columns,
            ..Self::default()
        }
    }

    pub fn with_intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = intro.into();
        self
    }

    /// Number of pages for `len` modules; never zero.
    pub fn page_count(&self, len: usize) -> usize {
        len.div_ceil(self.page_size.max(1)).max(1)
    }
}

/// A rendered help page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpPage {
    pub text: String,
    pub keyboard: InlineKeyboard,
    /// The page actually rendered, after clamping.
    pub page_index: usize,
    pub page_count: usize,
}

/// Renders one page of the help menu.
///
/// Out-of-range page indices are clamped to the last page.
pub fn render_help_page(page_index: usize, helpable: &CapabilityMap, layout: &HelpLayout) -> HelpPage {
    let page_size = layout.page_size.max(1);
    let page_count = layout.page_count(helpable.len());
    let page = page_index.min(page_count - 1);

    let buttons: Vec<InlineButton> = helpable
        .iter()
        .skip(page * page_size)
        .take(page_size)
        .map(|(key, module)| {
            InlineButton::callback(
                module.name(),
                HelpAction::Module(key.to_string()).to_callback_data(),
            )
        })
        .collect();

    let mut keyboard = InlineKeyboard::new();
    for row in buttons.chunks(layout.columns.max(1)) {
        keyboard.push_row(row.to_vec());
    }

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(InlineButton::callback(
            "<",
            HelpAction::Prev(page).to_callback_data(),
        ));
        nav.push(InlineButton::callback("Back", HelpAction::Back.to_callback_data()));
    }
    if page + 1 < page_count {
        nav.push(InlineButton::callback(
            ">",
            HelpAction::Next(page).to_callback_data(),
        ));
    }
    keyboard.push_row(nav);

    let text = if page_count > 1 {
        format!("{}\n\n_Page {}/{}_", layout.intro, page + 1, page_count)
    } else {
        layout.intro.clone()
    };

    HelpPage {
        text,
        keyboard,
        page_index: page,
        page_count,
    }
}

/// Renders one module's help: its display name followed by its help text.
pub fn render_module_help(key: &str, helpable: &CapabilityMap) -> Result<String, NotFound> {
    let module = helpable.get(key).ok_or_else(|| NotFound::new(key))?;
    let help = module.help_text().ok_or_else(|| NotFound::new(key))?;
    Ok(format!("*{} Module Help:*\n{}", module.name(), help))
}

/// Keyboard shown under a module's help.
pub fn module_help_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(vec![InlineButton::callback(
        "Back",
        HelpAction::Back.to_callback_data(),
    )])
}
