//! Tracing subscriber setup.
//!
//! Stderr output in pretty or JSON form, plus a daily-rotated file when
//! `logging.directory` is configured. Initialization is idempotent so tests
//! and repeated calls are harmless.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingSection};

static LOG_INIT: OnceLock<()> = OnceLock::new();

const LOG_FILE_PREFIX: &str = "taskflow.log";

/// `RUST_LOG` wins; otherwise the configured level, or `debug` when verbose.
pub fn build_filter(config: &LoggingSection, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if verbose { "debug" } else { config.level.as_str() };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process so buffered file output is flushed.
pub fn init_logging(config: &LoggingSection, verbose: bool) -> Result<Option<WorkerGuard>> {
    if LOG_INIT.get().is_some() {
        return Ok(None);
    }

    let filter = build_filter(config, verbose);
    let stderr_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Another subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    let _ = LOG_INIT.set(());

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_verbose_filter_is_debug_without_rust_log() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let filter = build_filter(&LoggingSection::default(), true);
        assert_eq!(filter.to_string(), "debug");
        let filter = build_filter(&LoggingSection::default(), false);
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_invalid_level_falls_back_to_info() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingSection {
            level: "taskflow=loud".into(),
            ..LoggingSection::default()
        };
        assert_eq!(build_filter(&config, false).to_string(), "info");
    }

    #[test]
    fn test_init_is_idempotent_and_creates_log_dir() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        let config = LoggingSection {
            directory: Some(logs.clone()),
            ..LoggingSection::default()
        };
        let first = init_logging(&config, false).unwrap();
        let second = init_logging(&config, false).unwrap();
        // Only the first call installs anything.
        if first.is_some() {
            assert!(logs.is_dir());
        }
        assert!(second.is_none());
        tracing::info!("logging initialized in test");
    }
}
