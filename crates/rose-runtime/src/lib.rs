//! Rose Runtime - configuration, logging and the update loop.
//!
//! This crate provides:
//! - Layered configuration ([`config`]) via figment
//! - Logging initialisation ([`logging`]) on tracing-subscriber
//! - [`RoseRuntime`]: selects and loads modules into a frozen registry,
//!   registers the core handlers (start, help, settings, migration, stats,
//!   info, import/export, donate) and drives updates through the dispatcher
//!
//! ```ignore
//! use rose_runtime::RoseRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = RoseRuntime::builder()
//!         .catalog(rose_modules::catalog())
//!         .build()?;
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(64);
//!     tokio::spawn(platform::poll_updates(tx));
//!     runtime.run(bot, rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
mod handlers;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, RoseConfig};
pub use error::{LoggingError, RuntimeError, RuntimeResult};
pub use handlers::DONATE_TEXT;
pub use logging::{init_from_config, try_init_from_config};
pub use runtime::{RoseRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
