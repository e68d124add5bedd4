//! Bridge configuration.
//!
//! [`BridgeSettings`] is a plain builder. [`BridgeSettings::from_env`] reads
//! overrides from the process environment:
//!
//! | Variable | Setting | Default |
//! |----------|---------|---------|
//! | `PONTOON_BRIDGE_DEBUG` | debug level | `0` |
//! | `PONTOON_TRACEBACK_BYTES` | traceback byte budget | `2048` |
//! | `PONTOON_CHUNK_BYTES` | streaming chunk budget | `16384` |
//! | `PONTOON_ID_POLICY` | `strict` or `lenient` | `strict` |
//!
//! # Example
//!
//! ```
//! use pontoon_core::{BridgeSettings, OperationIdPolicy};
//!
//! let settings = BridgeSettings::from_lookup(|var| match var {
//!     "PONTOON_BRIDGE_DEBUG" => Some("1".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//!
//! assert!(settings.verbose());
//! assert_eq!(settings.id_policy(), OperationIdPolicy::Strict);
//! ```

use crate::environment::Environment;
use crate::error::SettingsError;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Debug level variable.
pub const DEBUG_ENV_VAR: &str = "PONTOON_BRIDGE_DEBUG";
/// Traceback budget variable.
pub const TRACEBACK_ENV_VAR: &str = "PONTOON_TRACEBACK_BYTES";
/// Chunk budget variable.
pub const CHUNK_ENV_VAR: &str = "PONTOON_CHUNK_BYTES";
/// Operation-id policy variable.
pub const ID_POLICY_ENV_VAR: &str = "PONTOON_ID_POLICY";

/// Default traceback budget in bytes.
pub const DEFAULT_TRACEBACK_BYTES: usize = 2048;
/// Default number of traceback frames kept.
pub const DEFAULT_TRACEBACK_FRAMES: usize = 20;
/// Default chunk budget in bytes.
pub const DEFAULT_CHUNK_BYTES: usize = 16 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// OperationIdPolicy
// ─────────────────────────────────────────────────────────────────────────────

/// How a route's operation id is obtained when it is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationIdPolicy {
    /// Every route must carry an explicit operation id.
    #[default]
    Strict,
    /// Routes without an explicit id fall back to the handler's name.
    Lenient,
}

impl OperationIdPolicy {
    /// Returns the lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl fmt::Display for OperationIdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationIdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("expected `strict` or `lenient`, got `{other}`")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BridgeSettings
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration shared by the registry, interceptor and invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    debug_level: u8,
    traceback_bytes: usize,
    traceback_frames: usize,
    chunk_max_bytes: usize,
    id_policy: OperationIdPolicy,
    environment: Environment,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            debug_level: 0,
            traceback_bytes: DEFAULT_TRACEBACK_BYTES,
            traceback_frames: DEFAULT_TRACEBACK_FRAMES,
            chunk_max_bytes: DEFAULT_CHUNK_BYTES,
            id_policy: OperationIdPolicy::Strict,
            environment: Environment::current(),
        }
    }
}

impl BridgeSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] if a variable is set to a value
    /// that cannot be parsed.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads settings from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] if a variable is set to a value
    /// that cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(raw) = lookup(DEBUG_ENV_VAR) {
            settings.debug_level = parse_number(DEBUG_ENV_VAR, &raw)?;
        }
        if let Some(raw) = lookup(TRACEBACK_ENV_VAR) {
            settings.traceback_bytes = parse_number(TRACEBACK_ENV_VAR, &raw)?;
        }
        if let Some(raw) = lookup(CHUNK_ENV_VAR) {
            settings.chunk_max_bytes = parse_number(CHUNK_ENV_VAR, &raw)?;
        }
        if let Some(raw) = lookup(ID_POLICY_ENV_VAR) {
            settings.id_policy = raw
                .parse()
                .map_err(|reason: String| SettingsError::invalid_value(ID_POLICY_ENV_VAR, &raw, reason))?;
        }

        tracing::debug!(
            debug_level = settings.debug_level,
            id_policy = %settings.id_policy,
            "bridge settings loaded"
        );
        Ok(settings)
    }

    /// Sets the debug level.
    #[must_use]
    pub fn with_debug_level(mut self, level: u8) -> Self {
        self.debug_level = level;
        self
    }

    /// Sets the byte budget for tracebacks in error responses.
    #[must_use]
    pub fn with_traceback_budget(mut self, bytes: usize) -> Self {
        self.traceback_bytes = bytes;
        self
    }

    /// Sets how many frames a traceback keeps before truncation.
    #[must_use]
    pub fn with_traceback_frames(mut self, frames: usize) -> Self {
        self.traceback_frames = frames;
        self
    }

    /// Sets the byte budget for streamed chunks.
    #[must_use]
    pub fn with_chunk_max_bytes(mut self, bytes: usize) -> Self {
        self.chunk_max_bytes = bytes;
        self
    }

    /// Sets the operation-id policy.
    #[must_use]
    pub fn with_id_policy(mut self, policy: OperationIdPolicy) -> Self {
        self.id_policy = policy;
        self
    }

    /// Overrides the detected environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Returns the debug level.
    #[must_use]
    pub fn debug_level(&self) -> u8 {
        self.debug_level
    }

    /// Returns `true` when error responses carry diagnostics.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.debug_level >= 1
    }

    /// Returns the traceback byte budget.
    #[must_use]
    pub fn traceback_bytes(&self) -> usize {
        self.traceback_bytes
    }

    /// Returns the traceback frame limit.
    #[must_use]
    pub fn traceback_frames(&self) -> usize {
        self.traceback_frames
    }

    /// Returns the chunk byte budget.
    #[must_use]
    pub fn chunk_max_bytes(&self) -> usize {
        self.chunk_max_bytes
    }

    /// Returns the operation-id policy.
    #[must_use]
    pub fn id_policy(&self) -> OperationIdPolicy {
        self.id_policy
    }

    /// Returns the environment.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }
}

fn parse_number<T: FromStr>(var: &'static str, raw: &str) -> Result<T, SettingsError>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| SettingsError::invalid_value(var, raw, err.to_string()))
}
