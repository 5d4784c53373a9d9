//! Structured Logger
//!
//! Wraps `tracing` to provide console output (pretty or JSON), optional daily
//! rotated NDJSON files, and environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logger settings, usually taken from the server config.
#[derive(Debug, Clone)]
pub struct LogSettings<'a> {
    /// Fallback filter when `RUST_LOG` is not set, e.g. "info".
    pub level: &'a str,
    /// Emit JSON lines on the console instead of human-readable text.
    pub json: bool,
    /// Write NDJSON to `<dir>/smartvision.log.YYYY-MM-DD` as well.
    pub dir: Option<&'a Path>,
}

/// Initialize the global structured logger.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger(settings: &LogSettings<'_>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.level));

    let console_layer = if settings.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    let file_layer = settings.dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "smartvision.log");
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_ansi(false)
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
