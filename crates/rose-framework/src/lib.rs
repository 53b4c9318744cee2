//! # Rose Framework
//!
//! Module system and capability dispatch for the Rose bot.
//!
//! - **Modules** ([`module`]) – descriptors, the catalog and the live
//!   [`Module`] with its optional capability slots
//! - **Registry** ([`registry`]) – [`Registry::load_all`] builds the frozen,
//!   capability-indexed set of loaded modules
//! - **Dispatch** ([`dispatcher`], [`matcher`], [`handler`]) – grouped
//!   matchers over tower handler services
//! - **Presenters** ([`presenter`]) – paginated help menu and settings
//! - **Aggregators** ([`broadcast`], [`aggregate`], [`backup`]) – migration,
//!   stats, user info, import/export, each bounded per callback
//! - **Persistence** ([`store`]) – the namespaced key-value boundary
//!
//! # Quick start
//!
//! ```rust,ignore
//! use rose_framework::*;
//!
//! let registry = Registry::load_all(&["rules", "warns"], &catalog, &ModuleEnv::default());
//!
//! let mut dispatcher = Dispatcher::new(CommandParser::with_excl(true));
//! dispatcher.extend(registry.matchers().cloned());
//!
//! dispatcher.dispatch(update, bot).await;
//! ```

pub mod access;
pub mod aggregate;
pub mod backup;
pub mod broadcast;
pub mod capability;
pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod matcher;
pub mod matcher_builders;
pub mod module;
pub mod presenter;
pub mod registry;
pub mod store;

pub use access::AccessControl;
pub use aggregate::{collect_stats, collect_user_info};
pub use backup::{ImportReport, export_chat, import_chat};
pub use broadcast::{MigrationReport, on_chat_migrated};
pub use capability::{Capability, CapabilityList, CapabilityMap};
pub use command::{Command, CommandParser};
pub use context::UpdateContext;
pub use dispatcher::Dispatcher;
pub use error::{CapabilityError, CapabilityResult, ModuleLoadError, ModuleLoadResult, NotFound};
pub use handler::{BoxedHandler, into_handler};
pub use matcher::Matcher;
pub use matcher_builders::{on_callback, on_command, on_commands, on_message, on_migration};
pub use module::{Module, ModuleCatalog, ModuleContext, ModuleDescriptor, ModuleEnv};
pub use registry::{Registry, RegistryBuilder};
pub use store::{MemoryStore, Namespace, Store};

pub use tower::BoxError;
