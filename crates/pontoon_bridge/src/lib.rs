//! Endpoint registry and out-of-band invocation for Pontoon.
//!
//! This crate lets a host call web endpoints directly by operation id, without
//! an HTTP round-trip. Routes declared on a [`BridgeApp`] (or on any
//! [`Application`] once [`patch::enable`] has run) are recorded in an
//! [`EndpointRegistry`]; the [`Invoker`] then resolves arguments from
//! path/query/body inputs and dependency providers, runs the handler on
//! whatever async runtime is available, and serializes the result into an
//! [`Envelope`].
//!
//! # Quick Start
//!
//! ```
//! use pontoon_bridge::{BridgeApp, HttpException, InvokeRequest, endpoint};
//!
//! #[endpoint]
//! /// Fetch one item.
//! async fn get_item(#[from_path] item_id: i64) -> Result<String, HttpException> {
//!     if item_id == 0 {
//!         return Err(HttpException::not_found("no such item"));
//!     }
//!     Ok(format!("item {item_id}"))
//! }
//!
//! let mut app = BridgeApp::new("demo");
//! app.get("/items/{item_id}", "get_item", get_item()).unwrap();
//!
//! let envelope = app
//!     .invoker()
//!     .invoke_blocking(InvokeRequest::new("get_item").with_path_param("item_id", "7"));
//! assert_eq!(envelope.status_code, 200);
//! assert_eq!(envelope.content, "item 7");
//! ```
//!
//! # Architecture
//!
//! - [`framework`]: the route declaration surface ([`Application`], [`Router`])
//! - [`interceptor`]: records declarations ([`BridgeApp`], [`Interceptor`])
//! - [`registry`]: [`EndpointRegistry`] and its records
//! - [`resolver`]: binds request inputs to handler parameters
//! - [`invoke`]: the [`Invoker`] and its [`Envelope`] results
//! - [`runtime`]: runs async handlers from sync or async callers
//! - [`chunks`]: size-bounded streaming for embedded hosts

// Self-reference so `#[endpoint]`-generated code can use `pontoon_bridge::` paths within this crate.
extern crate self as pontoon_bridge;

pub mod chunks;
pub mod depends;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod framework;
pub mod handler;
pub mod interceptor;
pub mod invoke;
mod meta;
pub mod patch;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod signature;

pub use chunks::{LARGE_CHUNK_WARNING, chunk_stream};
pub use depends::{Depends, Injected, ProviderKind};
pub use diagnostics::{ErrorReport, format_error};
pub use error::{
    BindError, ForeignError, HandlerError, HttpException, RegistrationError, RuntimeError,
};
pub use frame::{Arg, CallFrame};
pub use framework::{
    Application, IncludeOptions, Method, Mount, Route, RouteEndpoint, RouteObserver,
    RouteOptions, Router, join_paths, route_observer, set_route_observer,
};
pub use handler::{Handler, HandlerFuture};
pub use interceptor::{BridgeApp, Interceptor};
pub use invoke::{
    Envelope, ForeignValue, InvocationPhase, InvokePayload, InvokeRequest, Invoker,
};
pub use registry::{
    EndpointDescriptor, EndpointRecord, EndpointRegistry, HandlerRef, META_OPERATION_IDS,
    RegistryEntry, is_meta_operation,
};
pub use resolver::{Kwargs, Params, ResolveInputs, convert_scalar, resolve};
pub use runtime::{LoopStrategy, run_to_completion};
pub use signature::{
    DeclaredType, ParamDefault, ParamLocation, ParamSpec, Parameter, Signature,
};

pub use pontoon_core::{BridgeSettings, OperationIdPolicy};
pub use pontoon_object::{IntoNode, Json, Node};

// Re-export proc macros.
pub use endpoint_macros::endpoint;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
