use std::{fs, path::Path};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

pub const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// `RUST_LOG` wins; otherwise everything at `level` and above.
fn filter(level: &str) -> EnvFilter {
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Log to stderr, for one-shot commands.
pub fn init_stderr(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .init();
}

/// Log to a daily rolling file, for the full-screen UI.
///
/// Keep the guard alive until exit or buffered lines are lost.
pub fn init_file(log_dir: &Path, level: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(log_dir, "weathernow.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
