//! Logging for Solar Scraper
//!
//! Two sinks are configured on top of `tracing`:
//!
//! - the debug sink receives INFO and DEBUG events and is only enabled with
//!   `--debug`; it writes to stdout
//! - the error sink receives WARN and ERROR events and is always enabled; it
//!   writes to stderr
//!
//! When a log file is given both sinks append to that file instead of the
//! console. `RUST_LOG` replaces the default filter.

mod structured;

pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context};

use crate::error::{Result, ScraperError};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{Level, Metadata, info};
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::{FilterFn, LevelFilter};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Keep the non-blocking worker guard alive for the entire process lifetime
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static INIT_ONCE: Once = Once::new();
static INIT_ERROR: OnceCell<String> = OnceCell::new();

/// Logging options taken from the command line
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    /// Append both sinks to this file instead of stdout/stderr
    pub file: Option<PathBuf>,
    /// Enable the debug sink
    pub debug: bool,
}

/// Initialize the logging system; later calls are no-ops
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    INIT_ONCE.call_once(|| {
        if let Err(e) = install(settings) {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    if let Some(err) = INIT_ERROR.get() {
        return Err(ScraperError::config(err.clone()));
    }
    Ok(())
}

fn install(settings: &LogSettings) -> Result<()> {
    let filter = build_env_filter(settings.debug);

    match &settings.file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            let appender = rolling::Builder::new()
                .rotation(rolling::Rotation::NEVER)
                .filename_prefix(name)
                .build(dir)
                .map_err(|e| ScraperError::io(format!("Failed to open log file: {}", e)))?;
            let (writer, guard) = non_blocking(appender);
            let _ = LOG_GUARD.set(guard);

            let debug_sink = fmt::layer()
                .with_writer(writer.clone())
                .with_ansi(false)
                .with_target(false)
                .with_filter(debug_sink_filter(settings.debug));
            let error_sink = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(LevelFilter::WARN);

            tracing_subscriber::registry()
                .with(filter)
                .with(debug_sink)
                .with(error_sink)
                .try_init()
                .map_err(|e| ScraperError::config(e.to_string()))?;
        }
        None => {
            let debug_sink = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_filter(debug_sink_filter(settings.debug));
            let error_sink = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN);

            tracing_subscriber::registry()
                .with(filter)
                .with(debug_sink)
                .with(error_sink)
                .try_init()
                .map_err(|e| ScraperError::config(e.to_string()))?;
        }
    }

    info!(
        "Logging initialized - debug: {}, file: {}",
        settings.debug,
        settings
            .file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "console".to_string())
    );
    Ok(())
}

fn build_env_filter(debug: bool) -> EnvFilter {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("solar_scraper={level},warn").into())
}

/// Events routed to the debug sink: INFO and DEBUG, only when enabled
fn debug_sink_filter(enabled: bool) -> FilterFn<impl Fn(&Metadata<'_>) -> bool> {
    FilterFn::new(move |meta| enabled && is_debug_sink_level(*meta.level()))
}

/// Whether an event level belongs to the debug sink rather than the error sink
pub fn is_debug_sink_level(level: Level) -> bool {
    level == Level::INFO || level == Level::DEBUG
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            ScraperError::validation("log", format!("not a file path: {}", path.display()))
        })?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_sink_levels() {
        assert!(is_debug_sink_level(Level::INFO));
        assert!(is_debug_sink_level(Level::DEBUG));
        assert!(!is_debug_sink_level(Level::WARN));
        assert!(!is_debug_sink_level(Level::ERROR));
        assert!(!is_debug_sink_level(Level::TRACE));
    }

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/solar.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log"));
        assert_eq!(name, "solar.log");

        let (dir, name) = split_log_path(Path::new("solar.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "solar.log");

        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        let settings = LogSettings::default();
        init_logging(&settings).ok();
        // A second call must not try to install another global subscriber
        let first = init_logging(&settings).is_ok();
        let second = init_logging(&settings).is_ok();
        assert_eq!(first, second);
    }
}
