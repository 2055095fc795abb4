//! File logging for the logdeck binary.
//!
//! Stdout carries viewport output, so diagnostics go to a daily rolling file
//! under the user's data directory.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Result, ResultExt};

/// Environment variable overriding the verbosity flag
pub const LOG_ENV: &str = "LOGDECK_LOG";

const LOG_FILE_PREFIX: &str = "logdeck.log";

/// Install the file subscriber and return the log directory.
///
/// `verbosity` is the number of `-v` flags: 0 logs info, 1 debug, 2 or more
/// trace for the logdeck crates. `LOGDECK_LOG` wins when set.
///
/// ```bash
/// LOGDECK_LOG=logdeck_engine=trace logdeck session.log
/// ```
pub fn init(verbosity: u8) -> Result<PathBuf> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("logdeck starting, verbosity {}", verbosity);
    Ok(log_dir)
}

/// Filter directives for a verbosity level
pub fn default_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("logdeck={level},logdeck_core={level},logdeck_engine={level},warn")
}

fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logdeck")
        .join("logs")
}
