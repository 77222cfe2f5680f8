//! Diagnostic logging setup with file rotation.

use crate::backend::{LOG_DIR, LoggingSettings};

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

const FILE_PREFIX: &str = "dsa-desktop";

/// Setup logging with console and rotating file output.
///
/// # Log Layers
/// - Console: human-readable, colored output (also the live view of `desktop.log`)
/// - File: plain text, daily rotation under `<app_dir>/logs/`
///
/// An unwritable log directory drops the file layer and keeps the console.
/// `RUST_LOG` takes precedence over the configured level.
pub fn setup_logging(
    app_dir: &Path,
    settings: &LoggingSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    let file_layer = match rolling_appender(app_dir, settings) {
        Ok(appender) => Some(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(appender),
        ),
        Err(e) => {
            eprintln!("File logging disabled, console only: {e}");
            None
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},desktop_log=info", settings.level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

pub(crate) fn rolling_appender(
    app_dir: &Path,
    settings: &LoggingSettings,
) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let logs_dir = app_dir.join(LOG_DIR);
    std::fs::create_dir_all(&logs_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(settings.retention_days)
        .filename_prefix(FILE_PREFIX)
        .filename_suffix("log")
        .build(&logs_dir)?;

    Ok(appender)
}

/// Path of today's diagnostic log file (the appender rotates on UTC dates).
pub fn current_log_path(app_dir: &Path) -> PathBuf {
    let today = chrono::Utc::now().format("%Y-%m-%d");
    app_dir
        .join(LOG_DIR)
        .join(format!("{FILE_PREFIX}.{today}.log"))
}
