//! Command modules.
//!
//! A module is the unit of bot functionality: a set of matchers registered
//! with the dispatcher plus optional capability callbacks (help, settings,
//! stats, user info, migration, import/export) consumed by the registry.
//!
//! A [`ModuleDescriptor`] is the static handle to a module.  It carries the
//! catalog name and a factory; the registry calls the factory with a
//! [`ModuleContext`] (store, access lists, config section) to obtain the live
//! [`Module`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! use rose::prelude::*;
//!
//! async fn shout(ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
//!     ctx.reply(&ctx.arg_text().to_uppercase()).await?;
//!     Ok(())
//! }
//!
//! pub const SHOUT: ModuleDescriptor = ModuleDescriptor::new("shout", |_| {
//!     Ok(Module::new("shout")
//!         .display_name("Shout")
//!         .help(" - /shout <text>: shout it.")
//!         .matcher(on_command("shout").handler(shout)))
//! });
//! ```

mod context;
mod core;
mod descriptor;

pub use context::{ModuleContext, ModuleEnv};
pub use self::core::{
    ChatSettingsFn, ExportFn, ImportFn, MigrateFn, Module, StatsFn, UserInfoFn, UserSettingsFn,
};
pub use descriptor::{ModuleCatalog, ModuleDescriptor};
