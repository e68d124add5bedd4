//! Ambient infrastructure for Pontoon.
//!
//! - [`environment`]: the process-wide embedded/server flag
//! - [`settings`]: [`BridgeSettings`] and its environment-variable loader
//! - [`tracing_setup`]: subscriber installation

pub mod environment;
mod error;
pub mod settings;
pub mod tracing_setup;

pub use environment::{Environment, EnvironmentInfo, is_truthy};
pub use error::SettingsError;
pub use settings::{BridgeSettings, OperationIdPolicy};
pub use tracing_setup::{TracingConfig, TracingFormat, init_tracing};
