//! Configuration for the Rose runtime.
//!
//! [`RoseConfig`] is layered from defaults, `rose.toml`, `ROSE_*` environment
//! variables and programmatic overrides by [`ConfigLoader`], then checked by
//! [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, CallbackConfig, HelpConfig, LogFormat, LogOutput, LogRotation, LoggingConfig,
    ModulesConfig, RoseConfig, SpanEventConfig,
};
pub use validation::validate_config;
