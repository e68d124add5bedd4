//! Tracing subscriber setup.
//!
//! The bridge crates only emit `tracing` events; installing a subscriber is
//! the host's choice. [`TracingConfig`] offers the usual setup, derived from
//! [`BridgeSettings`] when the bridge debug level should drive verbosity.
//!
//! # Example
//!
//! ```
//! use pontoon_core::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! TracingConfig::default()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("pontoon_bridge=debug,tokio=warn")
//!     .init();
//! ```

use crate::settings::BridgeSettings;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the bridge debug level onto a log level.
    ///
    /// `0` logs at `INFO`, `1` at `DEBUG`, and anything higher at `TRACE`,
    /// which includes invocation phase transitions.
    #[must_use]
    pub fn for_settings(settings: &BridgeSettings) -> Self {
        let level = match settings.debug_level() {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self::default().with_level(level)
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the configured level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns the configured format.
    #[must_use]
    pub fn format(&self) -> TracingFormat {
        self.format
    }

    /// Installs the global subscriber.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init(&self) {
        let env_filter = match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        };

        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        // try_init().ok() ignores errors if already initialized
        match self.format {
            TracingFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            TracingFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            TracingFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
        }

        tracing::debug!(level = %self.level, format = ?self.format, "tracing initialized");
    }
}

/// Installs a subscriber whose level follows the bridge debug level.
///
/// Shorthand for `TracingConfig::for_settings(settings).init()`.
pub fn init_tracing(settings: &BridgeSettings) {
    TracingConfig::for_settings(settings).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_pretty_info() {
        let config = TracingConfig::default();
        assert_eq!(config.format(), TracingFormat::Pretty);
        assert_eq!(config.level(), Level::INFO);
    }

    #[test]
    fn debug_level_maps_to_log_level() {
        let quiet = BridgeSettings::default();
        let verbose = BridgeSettings::default().with_debug_level(1);
        let noisy = BridgeSettings::default().with_debug_level(3);

        assert_eq!(TracingConfig::for_settings(&quiet).level(), Level::INFO);
        assert_eq!(TracingConfig::for_settings(&verbose).level(), Level::DEBUG);
        assert_eq!(TracingConfig::for_settings(&noisy).level(), Level::TRACE);
    }

    #[test]
    fn with_env_filter() {
        let config = TracingConfig::new().with_env_filter("pontoon_bridge=debug");
        assert_eq!(config.env_filter, Some("pontoon_bridge=debug".to_string()));
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = TracingConfig::new().with_format(TracingFormat::Compact);
        config.init();
        config.init();
    }
}
