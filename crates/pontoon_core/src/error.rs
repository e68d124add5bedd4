//! Error types for configuration loading.

use thiserror::Error;

/// Errors that can occur while loading [`BridgeSettings`](crate::BridgeSettings).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: &'static str,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl SettingsError {
    /// Creates an [`InvalidValue`](Self::InvalidValue).
    pub fn invalid_value(
        var: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            var,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
