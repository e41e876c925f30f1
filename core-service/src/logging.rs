//! # Logging Infrastructure
//!
//! Configures the `tracing-subscriber` stack for host applications. Hosts
//! that install their own subscriber can skip [`init_logging`] entirely;
//! everything in the core logs through `tracing` macros and works with any
//! subscriber.

use crate::error::{CoreError, Result};
use std::io;
use tracing_subscriber::{filter::EnvFilter, fmt::format::FmtSpan};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
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
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Custom filter string (e.g., "core_sync=trace,sqlx=warn")
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Initialize the logging system.
///
/// Call once during application startup; a second call fails because the
/// global subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stdout)
        .with_span_events(FmtSpan::CLOSE);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|e| CoreError::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom) => custom.clone(),
        // Default: core crates at info, noisy dependencies at warn
        None => "core_service=info,core_sync=info,core_index=info,\
                 bridge_desktop=info,sqlx=warn"
            .to_string(),
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| CoreError::Config(format!("Invalid log filter: {}", e)))
}
