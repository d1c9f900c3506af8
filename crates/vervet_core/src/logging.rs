//! Tracing setup for hosts embedding the connection core.
//!
//! Logs go to stdout and, unless stdout is a terminal, also to a daily-rotating
//! file under `<data_dir>/logs`. The filter is taken from the first of:
//! the `logFilter` configuration entry, `VERVET_LOG`, `RUST_LOG`, and a
//! build-dependent default.

use crate::config::{VervetConfig, CONFIG_FILE_NAME};
use crate::error::{Result, VervetError};

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted before RUST_LOG.
pub const LOG_ENV: &str = "VERVET_LOG";

/// Log directory name inside the data directory.
pub const LOG_DIR_NAME: &str = "logs";

const LOG_FILE_PREFIX: &str = "vervet";

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    /// Skip the log file (interactive terminals).
    pub console_only: bool,
    /// Filter directives overriding the environment.
    pub filter: Option<String>,
}

impl LogConfig {
    /// Settings for a data directory, using the filter from its configuration.
    pub fn for_data_dir(data_dir: &Path, config: &VervetConfig) -> Self {
        Self {
            log_dir: data_dir.join(LOG_DIR_NAME),
            console_only: atty::is(atty::Stream::Stdout),
            filter: config.log_filter.clone(),
        }
    }

    /// Read the configuration in `data_dir` and derive settings from it.
    ///
    /// Runs before the application state exists, so an unreadable
    /// configuration falls back to defaults here and is reported later when
    /// [`crate::state::VervetState`] loads it.
    pub fn load(data_dir: &Path) -> Self {
        let config = VervetConfig::load(&data_dir.join(CONFIG_FILE_NAME)).unwrap_or_default();
        Self::for_data_dir(data_dir, &config)
    }
}

/// Keeps the file writer alive. Dropping it flushes pending entries.
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// Falls back to stdout alone when the log file cannot be opened. A second
/// call leaves the first subscriber in place.
pub fn init_logging(config: &LogConfig) -> LoggingGuard {
    let filter = resolve_filter(config.filter.as_deref());
    if config.console_only {
        install_console(filter);
        return LoggingGuard { _worker: None };
    }

    match open_log_file(&config.log_dir) {
        Ok(appender) => {
            let (file, worker) = tracing_appender::non_blocking(appender);
            let writer = std::io::stdout.with_max_level(tracing::Level::INFO).and(file);
            let _ = tracing_subscriber::fmt()
                .with_writer(writer)
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(true)
                .try_init();
            LoggingGuard { _worker: Some(worker) }
        }
        Err(e) => {
            eprintln!("Warning: {e}. Logging to console only.");
            install_console(filter);
            LoggingGuard { _worker: None }
        }
    }
}

fn install_console(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_target(false)
        .try_init();
}

fn open_log_file(log_dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| VervetError::config(format!("Failed to open log file: {e}")))
}

fn resolve_filter(configured: Option<&str>) -> EnvFilter {
    if let Some(directives) = configured {
        return EnvFilter::try_new(directives)
            .unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    }

    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

/// Default filter directives for the build type.
pub fn default_log_filter() -> &'static str {
    #[cfg(debug_assertions)]
    {
        "debug,vervet_core=trace,mongodb=warn,hickory_proto=warn,hickory_resolver=warn"
    }
    #[cfg(not(debug_assertions))]
    {
        "info,vervet_core=info,mongodb=warn,hickory_proto=warn,hickory_resolver=warn"
    }
}
