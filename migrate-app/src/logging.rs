//! File logging. The console is reserved for RunUAT output, so tracing goes
//! to a daily rolling file in the data directory.

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use migrate_core::directory::Directory;

pub const LOG_FILE_PREFIX: &str = "uplugin-migrate.log";

/// Install the global subscriber. Keep the guard alive until exit or
/// buffered records are lost. `RUST_LOG` takes precedence over `level`.
pub fn init(level: &str) -> Result<WorkerGuard> {
    let log_dir =
        Directory::logs_directory().ok_or_else(|| anyhow!("Cannot get log directory"))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(env_filter(level))
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    tracing::info!("uplugin-migrate {} starting", env!("CARGO_PKG_VERSION"));
    Ok(guard)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("migrate_core={level},migrate_app={level}"))
    })
}
