//! Configuration schema definitions.
//!
//! Every section has a complete default, so an empty `rose.toml` (or none at
//! all) yields a runnable bot that loads every available module.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rose_core::UserId;
use rose_framework::presenter::HelpLayout;
use rose_framework::{AccessControl, CommandParser};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoseConfig {
    /// Bot identity, privileged users and concurrency.
    #[serde(default)]
    pub bot: BotConfig,

    /// Which modules to load.
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Help menu layout.
    #[serde(default)]
    pub help: HelpConfig,

    /// Capability callback bounds.
    #[serde(default)]
    pub callbacks: CallbackConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Free-form per-module sections, keyed by module name.
    #[serde(default)]
    pub module_config: HashMap<String, serde_json::Value>,
}

// =============================================================================
// Bot
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Name the bot introduces itself with.
    #[serde(default = "default_bot_name")]
    pub name: String,

    #[serde(default)]
    pub owner_id: Option<UserId>,

    #[serde(default)]
    pub owner_username: Option<String>,

    #[serde(default)]
    pub sudo_users: Vec<UserId>,

    #[serde(default)]
    pub support_users: Vec<UserId>,

    #[serde(default)]
    pub whitelist_users: Vec<UserId>,

    /// Accept `!` as a command prefix in addition to `/`.
    #[serde(default)]
    pub allow_excl: bool,

    /// Updates processed concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub donation_link: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            owner_id: None,
            owner_username: None,
            sudo_users: Vec::new(),
            support_users: Vec::new(),
            whitelist_users: Vec::new(),
            allow_excl: false,
            workers: default_workers(),
            donation_link: None,
        }
    }
}

impl BotConfig {
    /// Privilege tiers described by this section.
    pub fn access_control(&self) -> AccessControl {
        AccessControl::new(self.owner_id)
            .with_sudo(self.sudo_users.iter().copied())
            .with_support(self.support_users.iter().copied())
            .with_whitelist(self.whitelist_users.iter().copied())
    }

    pub fn command_parser(&self) -> CommandParser {
        CommandParser::with_excl(self.allow_excl)
    }
}

fn default_bot_name() -> String {
    "Rose".to_string()
}

fn default_workers() -> usize {
    8
}

// =============================================================================
// Modules
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Modules to load, in order. Empty loads everything available.
    #[serde(default)]
    pub load: Vec<String>,

    /// Modules never to load; applied after `load`.
    #[serde(default)]
    pub no_load: Vec<String>,
}

// =============================================================================
// Help / callbacks
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpConfig {
    /// Module buttons per help page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Module buttons per keyboard row.
    #[serde(default = "default_columns")]
    pub columns: usize,
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            columns: default_columns(),
        }
    }
}

impl HelpConfig {
    pub fn layout(&self) -> HelpLayout {
        HelpLayout::new(self.page_size, self.columns)
    }
}

fn default_page_size() -> usize {
    5
}

fn default_columns() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackConfig {
    /// Upper bound for any single capability callback, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl CallbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    5000
}

// =============================================================================
// Logging
// =============================================================================

/// Valid values for `logging.level` and `logging.filters`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `logging.file_path`.
    File,
}

/// When the log file is rolled over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-target levels, e.g. `rose_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Rotation of `file_path`; ignored for other outputs.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Rotated files kept on disk.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            filters: BTreeMap::new(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
        }
    }
}

impl LoggingConfig {
    /// The configured level, or `None` if it is not a valid level name.
    pub fn tracing_level(&self) -> Option<tracing::Level> {
        self.level.parse().ok()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_files() -> usize {
    5
}
