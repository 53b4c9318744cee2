//! Logging setup on `tracing-subscriber`, driven by [`LoggingConfig`].
//!
//! ```rust,ignore
//! use rose_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! `RUST_LOG`, when set, replaces the configured base level; the per-target
//! `logging.filters` are added on top of it.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};
use crate::error::LoggingError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed. If the log
/// file can't be opened, logs go to stdout instead.
pub fn init_from_config(config: &LoggingConfig) {
    if let Err(LoggingError::File(e)) = try_init_from_config(config)
        && install(config, BoxMakeWriter::new(std::io::stdout)).is_ok()
    {
        warn!(error = %e, "Couldn't open the log file, logging to stdout");
    }
}

/// Installs the global subscriber described by `config`.
pub fn try_init_from_config(config: &LoggingConfig) -> Result<(), LoggingError> {
    let writer = match config.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File => BoxMakeWriter::new(file_writer(config)?),
    };
    install(config, writer)
}

fn install(config: &LoggingConfig, writer: BoxMakeWriter) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(fmt_layer(config, writer))
        .with(env_filter(config))
        .try_init()?;
    Ok(())
}

fn fmt_layer(config: &LoggingConfig, writer: BoxMakeWriter) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events(&config.span_events))
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location);

    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Full => layer.boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
    }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let base = config.tracing_level().unwrap_or(tracing::Level::INFO);
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(base).into())
        .from_env_lossy();
    for directive in directives(config) {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }
    filter
}

/// `target=level` directives from `logging.filters`.
fn directives(config: &LoggingConfig) -> Vec<String> {
    config
        .filters
        .iter()
        .map(|(target, level)| format!("{target}={}", level.to_lowercase()))
        .collect()
}

fn span_events(config: &SpanEventConfig) -> FmtSpan {
    let flags = [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ];
    flags
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

/// Opens `logging.file_path`, rotated per `logging.rotation`.
fn file_writer(config: &LoggingConfig) -> Result<RollingFileAppender, LoggingError> {
    let path = config
        .file_path
        .as_deref()
        .ok_or(LoggingError::MissingFilePath)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("rose.log");

    let rotation = match config.rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    };
    Ok(RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(prefix)
        .max_log_files(config.max_files)
        .build(dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_filters_become_lowercase_directives() {
        let mut config = LoggingConfig::default();
        config.filters.insert("rose_modules".into(), "TRACE".into());
        config.filters.insert("rose_framework".into(), "debug".into());
        assert_eq!(
            directives(&config),
            ["rose_framework=debug", "rose_modules=trace"]
        );
    }

    #[test]
    fn test_span_event_flags() {
        assert_eq!(span_events(&SpanEventConfig::default()), FmtSpan::NONE);
        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(span_events(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);
        let all = SpanEventConfig {
            new: true,
            enter: true,
            exit: true,
            close: true,
        };
        assert_eq!(span_events(&all), FmtSpan::FULL);
    }

    #[test]
    fn test_file_output_opens_rotating_appender() {
        Jail::expect_with(|jail| {
            let config = LoggingConfig {
                output: LogOutput::File,
                file_path: Some(jail.directory().join("rose.log")),
                rotation: LogRotation::Daily,
                max_files: 3,
                ..Default::default()
            };
            assert!(file_writer(&config).is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_file_output_without_path_is_an_error() {
        let config = LoggingConfig {
            output: LogOutput::File,
            ..Default::default()
        };
        assert!(matches!(
            file_writer(&config),
            Err(LoggingError::MissingFilePath)
        ));
    }
}
