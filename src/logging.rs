//! Logging initialization.
//!
//! Events below error level go to stdout, errors to stderr. With a log
//! directory configured, the same split is written as JSON lines to daily
//! rolling `info` and `error` files.

use std::path::Path;

use thiserror::Error;
use tracing::{Level, Metadata};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::{self, LevelFilter};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Rotated files kept per log kind.
const MAX_LOG_FILES: usize = 30;

/// Errors that can occur while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory or file could not be created.
    #[error("failed to create log file appender: {0}")]
    Appender(#[from] InitError),

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Map a configured level name to a filter; unknown names fall back to info.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" | "warning" => LevelFilter::WARN,
        "err" | "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn is_error(metadata: &Metadata<'_>) -> bool {
    *metadata.level() == Level::ERROR
}

fn is_not_error(metadata: &Metadata<'_>) -> bool {
    !is_error(metadata)
}

fn file_appender(dir: &Path, prefix: &str) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `log_level`. The returned guards flush the file
/// writers on drop and must live until shutdown.
pub fn init(log_level: &str, log_path: Option<&Path>) -> Result<Vec<WorkerGuard>, LoggingError> {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(parse_level(log_level).into())
        .from_env_lossy();

    let console_out = layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_filter(filter::filter_fn(is_not_error));
    let console_err = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter::filter_fn(is_error));

    let mut guards = Vec::new();
    let (file_info, file_err) = match log_path {
        Some(dir) => {
            let (info_writer, info_guard) = tracing_appender::non_blocking(file_appender(dir, "info")?);
            let (err_writer, err_guard) = tracing_appender::non_blocking(file_appender(dir, "error")?);
            guards.push(info_guard);
            guards.push(err_guard);
            (
                Some(
                    layer()
                        .json()
                        .with_writer(info_writer)
                        .with_ansi(false)
                        .with_filter(filter::filter_fn(is_not_error)),
                ),
                Some(
                    layer()
                        .json()
                        .with_writer(err_writer)
                        .with_ansi(false)
                        .with_filter(filter::filter_fn(is_error)),
                ),
            )
        }
        None => (None, None),
    };

    registry()
        .with(env_filter)
        .with(console_out)
        .with(console_err)
        .with(file_info)
        .with(file_err)
        .try_init()?;
    Ok(guards)
}
