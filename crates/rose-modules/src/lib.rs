//! # Rose Modules
//!
//! The group-management modules shipped with Rose. Each one is a
//! [`ModuleDescriptor`] whose factory builds a live
//! [`Module`](rose_framework::Module) from its
//! [`ModuleContext`](rose_framework::ModuleContext):
//!
//! | catalog name | display name    | capabilities                                  |
//! |--------------|-----------------|-----------------------------------------------|
//! | `rules`      | Rules           | help, stats, migrate, import, export, settings |
//! | `warns`      | Warnings        | help, stats, migrate, chat settings           |
//! | `users`      | Users           | help, stats, user info, migrate               |
//! | `userinfo`   | Bios & Abouts   | help, user info                               |
//! | `shout`      | Shout           | help                                          |
//! | `blackout`   | Black Out       | help                                          |
//!
//! ```rust,ignore
//! let registry = Registry::load_all(&["rules", "warns"], &rose_modules::catalog(), &env);
//! ```

pub mod blackout;
mod helpers;
pub mod rules;
pub mod shout;
pub mod userinfo;
pub mod users;
pub mod warns;

use rose_framework::{ModuleCatalog, ModuleDescriptor};

pub use blackout::BLACKOUT;
pub use helpers::MAX_INFO_LEN;
pub use rules::RULES;
pub use shout::SHOUT;
pub use userinfo::USERINFO;
pub use users::USERS;
pub use warns::WARNS;

/// Every bundled module, in default load order.
pub const ALL: [ModuleDescriptor; 6] = [RULES, WARNS, USERS, USERINFO, SHOUT, BLACKOUT];

/// A catalog of every bundled module.
pub fn catalog() -> ModuleCatalog {
    ModuleCatalog::new(ALL)
}
