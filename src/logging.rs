//! Tracing setup.
//!
//! The TUI owns the terminal, so it logs to a daily-rolling file. One-shot
//! commands log to stderr. `RUST_LOG` wins over the configured level.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "notiq.log";

fn env_filter(default_level: &str) -> EnvFilter {
  EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(default_level))
    .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to `<dir>/notiq.log.<date>`. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init_file(dir: &Path, level: &str) -> std::io::Result<WorkerGuard> {
  std::fs::create_dir_all(dir)?;
  let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
  let (non_blocking, guard) = tracing_appender::non_blocking(appender);

  let layer = tracing_subscriber::fmt::layer()
    .with_writer(non_blocking)
    .with_ansi(false)
    .with_filter(env_filter(level));
  // A subscriber may already be set (tests); keep the existing one.
  let _ = tracing_subscriber::registry().with(layer).try_init();

  Ok(guard)
}

/// Log to stderr.
pub fn init_stderr(level: &str) {
  let layer = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_filter(env_filter(level));
  let _ = tracing_subscriber::registry().with(layer).try_init();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_invalid_level_falls_back() {
    // Must not panic on a nonsense directive.
    let filter = env_filter("not a level ===");
    let _ = filter.to_string();
  }
}
