//! Logging infrastructure for lnwatch.
//!
//! Structured logging using the `tracing` ecosystem. lnwatch keeps its own
//! log directory so a long-running monitor leaves a trail of every tick,
//! fetch failure and dispatched notification.
//!
//! ## Features
//!
//! - JSON lines format for machine parsing
//! - File output to `~/.lnwatch/logs/lnwatch.log`
//! - Console output with configurable verbosity
//!
//! ## Example
//!
//! ```no_run
//! use lnwatch_core::logging;
//!
//! // Initialize logging (call once at startup)
//! let _guard = logging::init_logging(None, false).expect("logging init");
//!
//! tracing::info!("lnwatch started");
//! tracing::debug!(node = "02ab...", "starting monitor");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{Result, WatchError};

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "lnwatch.log";

/// Guard that must be held to ensure log flushing on shutdown.
///
/// Keep this guard alive for the lifetime of the application.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the lnwatch logging system.
///
/// This sets up:
/// - File logging to `~/.lnwatch/logs/lnwatch.log` (JSON lines format)
/// - Console logging to stderr (human-readable format)
///
/// `verbose` raises the default level from INFO to DEBUG. `RUST_LOG`
/// overrides both.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| WatchError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "lnwatch={default_level},lnwatch_monitor={default_level},lnwatch_core={default_level}"
        ))
    });

    // JSON layer for file output
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    // Human-readable layer for console output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| WatchError::internal(format!("logging already initialized: {e}")))?;

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for testing.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Base directory for lnwatch state: `~/.lnwatch/`.
pub fn lnwatch_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| WatchError::Internal {
        message: "home directory could not be determined".into(),
    })?;

    Ok(home.join(".lnwatch"))
}

/// Get the default log directory path: `~/.lnwatch/logs/`.
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(lnwatch_home()?.join("logs"))
}

/// Get the default log file path: `~/.lnwatch/logs/lnwatch.log`.
pub fn default_log_file() -> Result<PathBuf> {
    Ok(default_log_dir()?.join(LOG_FILE_NAME))
}

/// Log an alert lifecycle event.
///
/// ```ignore
/// log_alert_event!("channel_offline", "notified", severity = "critical");
/// ```
#[macro_export]
macro_rules! log_alert_event {
    ($alert_type:expr, $event:expr) => {
        tracing::info!(
            target: "lnwatch::alert",
            alert_type = $alert_type,
            event = $event,
            "alert event"
        )
    };
    ($alert_type:expr, $event:expr, $($field:tt)*) => {
        tracing::info!(
            target: "lnwatch::alert",
            alert_type = $alert_type,
            event = $event,
            $($field)*,
            "alert event"
        )
    };
}

/// Log the outcome of one monitoring tick.
///
/// ```ignore
/// log_tick!(entity = "02ab...", fetched = 3, new = 1);
/// ```
#[macro_export]
macro_rules! log_tick {
    ($($field:tt)*) => {
        tracing::debug!(
            target: "lnwatch::tick",
            $($field)*,
            "tick"
        )
    };
}
