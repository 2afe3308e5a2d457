//! provides logging helpers

use core::error::Error;
use std::path::Path;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::InitError;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Environment variable holding the log file path. Logs go to stderr when unset.
pub const LOG_PATH_ENV_VAR: &str = "LOG_PATH";

/// Why a log file could not be opened
#[derive(Debug, derive_more::Display)]
pub enum LogFileError {
    #[display("invalid log file path: {}", path.display())]
    InvalidPath { path: PathBuf },
    #[display("failed to open rolling log file: {_0}")]
    Init(InitError),
}

impl Error for LogFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LogFileError::InvalidPath { .. } => None,
            LogFileError::Init(e) => Some(e),
        }
    }
}

/// initiate the global tracing subscriber
///
/// With a `log_path`, events are written to a daily rotated file through a
/// non-blocking writer; keep the returned guard alive until exit so buffered
/// lines are flushed. If the file cannot be opened, logging falls back to
/// stderr and the failure is logged once the subscriber is installed.
pub fn init(log_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let appender = log_path.map(file_appender).transpose();

    let (fmt_layer, guard, fallback_reason) = match appender {
        Ok(Some(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let fmt_layer = layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter)
                .boxed();
            (fmt_layer, Some(guard), None)
        }
        Ok(None) => (stderr_layer(env_filter), None, None),
        Err(reason) => (stderr_layer(env_filter), None, Some(reason)),
    };

    registry().with(fmt_layer).init();

    if let Some(reason) = fallback_reason {
        tracing::warn!("Failed to open log file, logging to stderr: {reason}");
    }
    guard
}

fn stderr_layer<S>(
    env_filter: filter::EnvFilter,
) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter)
        .boxed()
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, LogFileError> {
    let (Some(dir), Some(file)) = (path.parent(), path.file_name()) else {
        return Err(LogFileError::InvalidPath {
            path: path.to_path_buf(),
        });
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file.to_string_lossy())
        .max_log_files(3)
        .build(dir)
        .map_err(LogFileError::Init)
}
