//! Embedded-versus-server environment detection.
//!
//! The flag is computed once per process and cached. A build for a `wasm`
//! target is always embedded; otherwise the `PONTOON_EMBEDDED` variable
//! decides, so a native host that drives the bridge without a server can opt
//! in.

use crate::settings::BridgeSettings;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Variable that marks a native process as embedded.
pub const EMBEDDED_ENV_VAR: &str = "PONTOON_EMBEDDED";

static CURRENT: OnceLock<Environment> = OnceLock::new();

/// The kind of host the bridge runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Hosted inside another runtime with its own execution loop.
    Embedded,
    /// A standalone server process.
    Server,
}

impl Environment {
    /// Returns the environment of this process, detected on first use.
    #[must_use]
    pub fn current() -> Self {
        *CURRENT.get_or_init(|| {
            let detected = Self::detect_with(|var| std::env::var(var).ok());
            tracing::debug!(environment = detected.as_str(), "environment detected");
            detected
        })
    }

    /// Detects the environment from a variable lookup, without caching.
    pub fn detect_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        if cfg!(target_family = "wasm") {
            return Self::Embedded;
        }
        match lookup(EMBEDDED_ENV_VAR) {
            Some(value) if is_truthy(&value) => Self::Embedded,
            _ => Self::Server,
        }
    }

    /// Returns `true` for [`Environment::Embedded`].
    #[must_use]
    pub fn is_embedded(self) -> bool {
        matches!(self, Self::Embedded)
    }

    /// Returns the lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Server => "server",
        }
    }

    /// Returns a human-readable description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Embedded => "Embedded interpreter host",
            Self::Server => "Standalone server",
        }
    }
}

/// Returns `true` for `1`, `true`, `yes` and `on`, ignoring case and
/// surrounding whitespace.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// A serializable snapshot of the runtime environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentInfo {
    /// Detected environment.
    #[serde(rename = "type")]
    pub kind: Environment,
    /// Human-readable description of `kind`.
    pub description: &'static str,
    /// Whether the bridge is embedded.
    pub is_embedded: bool,
    /// Target platform, or `"embedded"` when embedded.
    pub platform: &'static str,
    /// Version of the bridge crates.
    pub version: &'static str,
    /// Configured debug level.
    pub debug_level: u8,
}

impl EnvironmentInfo {
    /// Collects information for the given settings.
    #[must_use]
    pub fn collect(settings: &BridgeSettings) -> Self {
        let kind = settings.environment();
        Self {
            kind,
            description: kind.description(),
            is_embedded: kind.is_embedded(),
            platform: if kind.is_embedded() {
                "embedded"
            } else {
                std::env::consts::OS
            },
            version: env!("CARGO_PKG_VERSION"),
            debug_level: settings.debug_level(),
        }
    }
}
