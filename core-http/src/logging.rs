//! Logging bootstrap for SDK hosts.
//!
//! Thin configuration layer over `tracing-subscriber`. Hosts that already run
//! their own subscriber can skip this entirely; the crates only emit through
//! the `tracing` macros.

use tracing_subscriber::EnvFilter;

use crate::error::{HttpError, Result};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Custom filter string (e.g. "core_http=debug,core_auth=trace");
    /// falls back to `RUST_LOG`, then "info"
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set a custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Display target module in logs
    pub fn with_target(mut self, display_target: bool) -> Self {
        self.display_target = display_target;
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error for a malformed filter string or when a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = match &config.filter {
        Some(filter) => EnvFilter::try_new(filter),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info")),
    }
    .map_err(|e| HttpError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.display_target);

    match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    }
    .map_err(|e| HttpError::Logging(e.to_string()))
}
