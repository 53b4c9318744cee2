//! # Rose
//!
//! A group-management chat bot assembled from independent command modules.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────────────────────────┐
//! │   Runtime   │────▶│ Dispatcher │────▶│ core handlers  (/help, ...)  │
//! │ (workers)   │     │  (groups)  │────▶│ module "rules" matchers      │
//! └─────────────┘     └────────────┘────▶│ module "warns" matchers ...  │
//!        │                               └──────────────────────────────┘
//!        ▼
//! ┌────────────────────────────────────────────────────────┐
//! │ Registry: modules indexed by capability                │
//! │ help · settings · migrate · stats · user info · backup │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, selects and loads modules, runs the
//!   update loop
//! - **Registry**: frozen after loading; the help menu, settings, `/stats`,
//!   `/info`, migrations and backups all read it
//! - **Modules**: each owns its commands and its own key space in the store
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rose::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = RoseRuntime::builder()
//!         .catalog(rose::modules::catalog())
//!         .build()?;
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(64);
//!     // feed `tx` from the platform binding
//!     runtime.run(bot, rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `rose.toml` (default)
//! - `yaml-config`: read `rose.yaml`
//! - `json-log`: JSON log output

pub use rose_core as core;
pub use rose_framework as framework;
pub use rose_modules as modules;
pub use rose_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use rose::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use rose_runtime::{RoseConfig, RoseRuntime, RuntimeBuilder};

    // Module system
    pub use rose_framework::{
        BoxError, Module, ModuleCatalog, ModuleContext, ModuleDescriptor, Namespace,
        UpdateContext,
    };

    // Matcher presets
    pub use rose_framework::{on_callback, on_command, on_commands, on_message, on_migration};

    // Platform types
    pub use rose_core::{
        Bot, BoxedBot, Chat, ChatId, InlineButton, InlineKeyboard, Update, User, UserId,
    };
}
