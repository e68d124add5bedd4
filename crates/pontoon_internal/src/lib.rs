//! # Pontoon Internal Library
//!
//! Re-exports the core Pontoon crates for convenience.

/// Settings, environment detection and tracing setup.
pub use pontoon_core;

/// Object graph and cycle-safe serializer.
pub use pontoon_object;

/// Endpoint registry and out-of-band invocation.
pub use pontoon_bridge;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use pontoon_bridge::{
        BridgeApp, Depends, Envelope, HandlerError, HttpException, InvokeRequest, Invoker, Json,
        Method, RouteEndpoint, RouteOptions, Router, endpoint,
    };
    pub use pontoon_core::{BridgeSettings, OperationIdPolicy, init_tracing};
    pub use pontoon_object::{IntoNode, MapRef, Node, serialize};
}
