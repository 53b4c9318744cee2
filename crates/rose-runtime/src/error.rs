//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A shutdown signal listener could not be installed.
    #[error("Failed to listen for shutdown signals: {0}")]
    Signal(#[source] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors installing the log subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// `logging.output` is `file` but no `logging.file_path` is set.
    #[error("logging.output is file but logging.file_path is not set")]
    MissingFilePath,

    /// The log file or its directory could not be created.
    #[error("Failed to open the log file: {0}")]
    File(#[from] tracing_appender::rolling::InitError),

    /// A global subscriber is already installed.
    #[error(transparent)]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}
