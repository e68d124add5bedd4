//! The invocation engine.
//!
//! [`Invoker`] is the bridge's whole public call surface: given an operation
//! id and request inputs it looks the endpoint up, resolves arguments, runs
//! the handler and serializes the result. Every outcome comes back as an
//! [`Envelope`]; nothing escapes as an error or a panic.
//!
//! One invocation moves through [`InvocationPhase`]s:
//!
//! ```text
//! Pending -> ResolvingArgs -> Executing -> SerializingSuccess -> Done
//!                                      \-> FormattingError    -> Done
//! ```
//!
//! A failed invocation is reported once and never retried.

use crate::chunks;
use crate::depends::Injected;
use crate::diagnostics::format_error;
use crate::error::{ForeignError, HandlerError};
use crate::frame::Arg;
use crate::registry::EndpointRegistry;
use crate::resolver::{Kwargs, Params, ResolveInputs, resolve};
use crate::runtime::run_to_completion;
use core::fmt;
use futures::{FutureExt, Stream};
use pontoon_core::BridgeSettings;
use pontoon_object::{Node, serialize};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// The uniform result of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Response body.
    pub content: Value,
    /// HTTP-style status code.
    pub status_code: u16,
}

impl Envelope {
    /// Creates an envelope.
    #[must_use]
    pub fn new(status_code: u16, content: Value) -> Self {
        Self {
            content,
            status_code,
        }
    }

    /// Creates a `200` envelope.
    #[must_use]
    pub fn ok(content: Value) -> Self {
        Self::new(200, content)
    }

    /// Returns `true` for a `2xx` status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Phases of a single invocation, traced at `trace` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationPhase {
    /// Looking up the endpoint.
    Pending,
    /// Building the call frame.
    ResolvingArgs,
    /// Running the handler.
    Executing,
    /// Serializing a successful result.
    SerializingSuccess,
    /// Turning a failure into an envelope.
    FormattingError,
    /// Finished.
    Done,
}

impl InvocationPhase {
    /// Returns the phase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ResolvingArgs => "resolving_args",
            Self::Executing => "executing",
            Self::SerializingSuccess => "serializing_success",
            Self::FormattingError => "formatting_error",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for InvocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(phase: InvocationPhase) {
    tracing::trace!(phase = phase.as_str(), "invocation phase");
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// A full invocation request, including direct keyword arguments.
#[derive(Debug, Default)]
pub struct InvokeRequest {
    operation_id: String,
    path_params: Params,
    query_params: Params,
    body: Option<Value>,
    kwargs: Kwargs,
}

impl InvokeRequest {
    /// Creates a request for `operation_id` with no inputs.
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            ..Self::default()
        }
    }

    /// Returns the operation id.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Replaces all path parameters.
    #[must_use]
    pub fn with_path_params(mut self, params: Params) -> Self {
        self.path_params = params;
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Replaces all query parameters.
    #[must_use]
    pub fn with_query_params(mut self, params: Params) -> Self {
        self.query_params = params;
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Option<Value>>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a direct keyword argument, used verbatim.
    #[must_use]
    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), Arg::Value(value.into()));
        self
    }

    /// Adds a typed direct keyword argument, such as a dependency override.
    #[must_use]
    pub fn with_injected<T: Send + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.kwargs
            .insert(name.into(), Arg::Injected(Box::new(value) as Injected));
        self
    }
}

/// The body accepted by the `POST /bridge/invoke/{operation_id}` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvokePayload {
    /// Path parameters.
    #[serde(default)]
    pub path_params: Params,
    /// Query parameters.
    #[serde(default)]
    pub query_params: Params,
    /// Request body.
    #[serde(default)]
    pub body: Option<Value>,
}

impl InvokePayload {
    /// Turns the payload into a request for `operation_id`.
    #[must_use]
    pub fn into_request(self, operation_id: impl Into<String>) -> InvokeRequest {
        InvokeRequest::new(operation_id)
            .with_path_params(self.path_params)
            .with_query_params(self.query_params)
            .with_body(self.body)
    }
}

/// A body handed over by an embedding host in its own representation.
pub trait ForeignValue {
    /// Unwraps the value into JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`ForeignError`] when the value has no JSON form.
    fn into_json(self) -> Result<Value, ForeignError>;
}

impl ForeignValue for Value {
    fn into_json(self) -> Result<Value, ForeignError> {
        Ok(self)
    }
}

/// JSON text, as passed across a string-only message channel.
impl ForeignValue for &str {
    fn into_json(self) -> Result<Value, ForeignError> {
        serde_json::from_str(self).map_err(|err| ForeignError(err.to_string()))
    }
}

impl ForeignValue for String {
    fn into_json(self) -> Result<Value, ForeignError> {
        self.as_str().into_json()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoker
// ─────────────────────────────────────────────────────────────────────────────

/// Invokes registered endpoints by operation id.
#[derive(Debug, Clone)]
pub struct Invoker {
    registry: Arc<EndpointRegistry>,
    settings: BridgeSettings,
}

impl Invoker {
    /// Creates an invoker over `registry`.
    #[must_use]
    pub fn new(registry: Arc<EndpointRegistry>, settings: BridgeSettings) -> Self {
        Self { registry, settings }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Invokes `operation_id` with path, query and body inputs.
    pub async fn invoke(
        &self,
        operation_id: &str,
        path_params: &Params,
        query_params: &Params,
        body: Option<Value>,
    ) -> Envelope {
        let request = InvokeRequest::new(operation_id)
            .with_path_params(path_params.clone())
            .with_query_params(query_params.clone())
            .with_body(body);
        self.invoke_request(request).await
    }

    /// Invokes with a body supplied in the host's representation.
    ///
    /// A body that cannot be unwrapped is dropped with a warning and the
    /// handler is invoked without one.
    pub async fn invoke_foreign<F: ForeignValue>(
        &self,
        operation_id: &str,
        path_params: &Params,
        query_params: &Params,
        body: Option<F>,
    ) -> Envelope {
        let body = match body.map(ForeignValue::into_json).transpose() {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(%operation_id, error = %err, "foreign body dropped");
                None
            }
        };
        self.invoke(operation_id, path_params, query_params, body)
            .await
    }

    /// Invokes a full request.
    pub async fn invoke_request(&self, request: InvokeRequest) -> Envelope {
        let span = tracing::debug_span!("invoke", operation_id = %request.operation_id);
        self.run(request).instrument(span).await
    }

    /// Invokes a full request from synchronous code.
    ///
    /// See [`run_to_completion`] for how the call is driven.
    pub fn invoke_blocking(&self, request: InvokeRequest) -> Envelope {
        let operation_id = request.operation_id.clone();
        match run_to_completion(self.settings.environment(), self.invoke_request(request)) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::error!(%operation_id, error = %err, "invocation could not be driven");
                Envelope::new(
                    500,
                    json!({"error": "RuntimeError", "detail": err.to_string()}),
                )
            }
        }
    }

    /// Wraps a stream of results into size-bounded chunk envelopes, using the
    /// configured chunk budget.
    pub fn chunk_stream<S>(&self, items: S) -> impl Stream<Item = Value> + Send + use<S>
    where
        S: Stream<Item = Node> + Send + 'static,
    {
        chunks::chunk_stream(items, self.settings.chunk_max_bytes())
    }

    async fn run(&self, request: InvokeRequest) -> Envelope {
        let InvokeRequest {
            operation_id,
            path_params,
            query_params,
            body,
            kwargs,
        } = request;

        enter(InvocationPhase::Pending);
        let Some(record) = self.registry.lookup(&operation_id) else {
            tracing::warn!(%operation_id, "unknown operation");
            return self.not_found(&operation_id);
        };

        let Some(handler) = record.handler.as_live().cloned() else {
            tracing::error!(%operation_id, handler = %record.handler.name(), "registered handler is not callable");
            return Envelope::new(
                500,
                json!({"detail": format!("Handler for '{operation_id}' is not callable")}),
            );
        };
        let signature = record
            .signature
            .clone()
            .unwrap_or_else(|| Arc::new(handler.signature()));

        let inputs = ResolveInputs {
            path_params,
            query_params,
            body,
            kwargs,
        };
        let outcome = AssertUnwindSafe(async {
            enter(InvocationPhase::ResolvingArgs);
            let frame = resolve(&signature, inputs).await;
            tracing::debug!(
                params = ?frame.names().collect::<Vec<_>>(),
                "arguments resolved"
            );

            enter(InvocationPhase::Executing);
            let node = handler.call(frame).await?;

            enter(InvocationPhase::SerializingSuccess);
            Ok::<_, HandlerError>(serialize(&node))
        })
        .catch_unwind()
        .await;

        let envelope = match outcome {
            Ok(Ok(content)) => Envelope::ok(content),
            Ok(Err(err)) => {
                enter(InvocationPhase::FormattingError);
                self.error_envelope(&operation_id, &err)
            }
            Err(payload) => {
                enter(InvocationPhase::FormattingError);
                let detail = panic_message(payload.as_ref());
                tracing::error!(%operation_id, %detail, "handler panicked");
                Envelope::new(500, json!({"error": "panic", "detail": detail}))
            }
        };

        enter(InvocationPhase::Done);
        envelope
    }

    fn not_found(&self, operation_id: &str) -> Envelope {
        let mut content = json!({"detail": format!("Operation '{operation_id}' not found")});
        if self.settings.verbose() {
            content["available_operations"] = json!(self.registry.operation_ids());
        }
        Envelope::new(404, content)
    }

    fn error_envelope(&self, operation_id: &str, err: &HandlerError) -> Envelope {
        if let Some(http) = err.http_exception() {
            tracing::debug!(%operation_id, status = http.status_code, detail = %http.detail, "handler raised client error");
            return Envelope::new(http.status_code, json!({"detail": http.detail}));
        }

        tracing::error!(%operation_id, kind = err.kind(), error = %err, "handler failed");
        Envelope::new(500, format_error(err, &self.settings).to_value())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpException;
    use crate::frame::CallFrame;
    use crate::framework::Method;
    use crate::handler::{Handler, HandlerFuture};
    use crate::registry::{EndpointRecord, HandlerRef};
    use crate::signature::{DeclaredType, Parameter, Signature};
    use pontoon_object::IntoNode;

    struct Echo;

    impl Handler for Echo {
        fn signature(&self) -> Signature {
            Signature::new("echo").with_param(Parameter::new("value", DeclaredType::Json))
        }

        fn call(&self, mut frame: CallFrame) -> HandlerFuture<'_> {
            Box::pin(async move {
                let value: Value = frame.take_value("value")?;
                Ok(value.into_node())
            })
        }
    }

    struct Fails(u16);

    impl Handler for Fails {
        fn signature(&self) -> Signature {
            Signature::new("fails")
        }

        fn call(&self, _frame: CallFrame) -> HandlerFuture<'_> {
            let status = self.0;
            Box::pin(async move {
                if status == 500 {
                    Err(HandlerError::msg("database exploded"))
                } else {
                    Err(HttpException::new(status, "nope").into())
                }
            })
        }
    }

    fn invoker(settings: BridgeSettings) -> Invoker {
        let registry = EndpointRegistry::shared();
        registry.register(EndpointRecord::new(
            "echo",
            "/echo",
            Method::Post,
            HandlerRef::Live(Arc::new(Echo)),
        ));
        registry.register(EndpointRecord::new(
            "teapot",
            "/teapot",
            Method::Get,
            HandlerRef::Live(Arc::new(Fails(418))),
        ));
        registry.register(EndpointRecord::new(
            "broken",
            "/broken",
            Method::Get,
            HandlerRef::Live(Arc::new(Fails(500))),
        ));
        registry.register(EndpointRecord::new(
            "static_files",
            "/static",
            Method::Get,
            HandlerRef::Native("static_files".to_string()),
        ));
        Invoker::new(registry, settings)
    }

    #[tokio::test]
    async fn body_round_trips() {
        let envelope = invoker(BridgeSettings::default())
            .invoke("echo", &Params::new(), &Params::new(), Some(json!({"a": 1})))
            .await;
        assert_eq!(envelope, Envelope::ok(json!({"a": 1})));
    }

    #[tokio::test]
    async fn unknown_operation_is_404() {
        let quiet = invoker(BridgeSettings::default())
            .invoke("nope", &Params::new(), &Params::new(), None)
            .await;
        assert_eq!(quiet.status_code, 404);
        assert_eq!(quiet.content["detail"], "Operation 'nope' not found");
        assert!(quiet.content.get("available_operations").is_none());

        let verbose = invoker(BridgeSettings::default().with_debug_level(1))
            .invoke("nope", &Params::new(), &Params::new(), None)
            .await;
        assert_eq!(
            verbose.content["available_operations"],
            json!(["echo", "teapot", "broken", "static_files"])
        );
    }

    #[tokio::test]
    async fn native_handler_is_not_callable() {
        let envelope = invoker(BridgeSettings::default())
            .invoke("static_files", &Params::new(), &Params::new(), None)
            .await;
        assert_eq!(envelope.status_code, 500);
        assert_eq!(
            envelope.content["detail"],
            "Handler for 'static_files' is not callable"
        );
    }

    #[tokio::test]
    async fn client_errors_pass_through() {
        let envelope = invoker(BridgeSettings::default())
            .invoke_request(InvokeRequest::new("teapot"))
            .await;
        assert_eq!(envelope, Envelope::new(418, json!({"detail": "nope"})));
    }

    #[tokio::test]
    async fn unexpected_errors_are_500() {
        let envelope = invoker(BridgeSettings::default())
            .invoke_request(InvokeRequest::new("broken"))
            .await;
        assert_eq!(
            envelope,
            Envelope::new(500, json!({"error": "Error", "detail": "database exploded"}))
        );
    }

    #[tokio::test]
    async fn foreign_json_text_is_unwrapped() {
        let invoker = invoker(BridgeSettings::default());
        let envelope = invoker
            .invoke_foreign("echo", &Params::new(), &Params::new(), Some(r#"{"b": [1, 2]}"#))
            .await;
        assert_eq!(envelope.content, json!({"b": [1, 2]}));

        let dropped = invoker
            .invoke_foreign("echo", &Params::new(), &Params::new(), Some("{not json"))
            .await;
        assert_eq!(dropped, Envelope::ok(Value::Null));
    }

    #[test]
    fn blocking_without_runtime() {
        let envelope = invoker(BridgeSettings::default())
            .invoke_blocking(InvokeRequest::new("echo").with_kwarg("value", "direct"));
        assert_eq!(envelope, Envelope::ok(json!("direct")));
    }

    #[test]
    fn payload_defaults() {
        let payload: InvokePayload = serde_json::from_value(json!({})).unwrap();
        assert_eq!(payload, InvokePayload::default());

        let payload: InvokePayload =
            serde_json::from_value(json!({"path_params": {"id": "1"}, "body": [1]})).unwrap();
        let request = payload.into_request("get_item");
        assert_eq!(request.operation_id(), "get_item");
        assert_eq!(request.path_params["id"], "1");
        assert_eq!(request.body, Some(json!([1])));
    }
}
