//! The endpoint registry.
//!
//! [`EndpointRegistry`] maps operation ids to [`EndpointRecord`]s. It is
//! filled while the application is being declared and read on every
//! invocation; registering an id that already exists replaces the record
//! but keeps its original position.
//!
//! The registry is an ordinary value. Share one through an `Arc` between the
//! interceptor and the invoker; tests build their own instead of clearing a
//! global one.

use crate::framework::Method;
use crate::handler::Handler;
use crate::signature::Signature;
use core::fmt;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Operation ids of the bridge's own introspection endpoints, which
/// [`EndpointRegistry::list`] leaves out.
pub const META_OPERATION_IDS: [&str; 3] = [
    "get_bridge_endpoints",
    "get_bridge_registry",
    "invoke_bridge_endpoint",
];

/// Returns `true` for the bridge's own endpoints.
#[must_use]
pub fn is_meta_operation(operation_id: &str) -> bool {
    META_OPERATION_IDS.contains(&operation_id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// The callable behind a record.
#[derive(Clone)]
pub enum HandlerRef {
    /// A live handler.
    Live(Arc<dyn Handler>),
    /// A route served by the host; the bridge cannot call it.
    Native(String),
}

impl HandlerRef {
    /// Returns the handler name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Live(handler) => handler.signature().name,
            Self::Native(name) => name.clone(),
        }
    }

    /// Returns the live handler, if there is one.
    #[must_use]
    pub fn as_live(&self) -> Option<&Arc<dyn Handler>> {
        match self {
            Self::Live(handler) => Some(handler),
            Self::Native(_) => None,
        }
    }

    /// Returns `true` if both refer to the same handler.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Live(a), Self::Live(b)) => Arc::ptr_eq(a, b),
            (Self::Native(a), Self::Native(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live(_) => f.debug_tuple("Live").field(&self.name()).finish(),
            Self::Native(name) => f.debug_tuple("Native").field(name).finish(),
        }
    }
}

/// One registered route.
#[derive(Debug, Clone)]
pub struct EndpointRecord {
    /// Unique key.
    pub operation_id: String,
    /// Fully qualified path template.
    pub path: String,
    /// HTTP method.
    pub method: Method,
    /// The callable.
    pub handler: HandlerRef,
    /// The handler's descriptor table, captured at registration.
    pub signature: Option<Arc<Signature>>,
    /// Human summary.
    pub summary: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Response model name.
    pub response_model: Option<String>,
    /// Request model name.
    pub request_model: Option<String>,
}

impl EndpointRecord {
    /// Creates a record with the `"METHOD PATH"` summary and no models.
    pub fn new(
        operation_id: impl Into<String>,
        path: impl Into<String>,
        method: Method,
        handler: HandlerRef,
    ) -> Self {
        let path = path.into();
        let signature = handler
            .as_live()
            .map(|handler| Arc::new(handler.signature()));
        Self {
            operation_id: operation_id.into(),
            summary: format!("{method} {path}"),
            path,
            method,
            handler,
            signature,
            tags: Vec::new(),
            response_model: None,
            request_model: None,
        }
    }

    /// Sets the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the response model name.
    #[must_use]
    pub fn with_response_model(mut self, model: Option<String>) -> Self {
        self.response_model = model;
        self
    }

    /// Sets the request model name.
    #[must_use]
    pub fn with_request_model(mut self, model: Option<String>) -> Self {
        self.request_model = model;
        self
    }

    /// Returns the public description of this record.
    #[must_use]
    pub fn descriptor(&self) -> EndpointDescriptor {
        EndpointDescriptor {
            operation_id: self.operation_id.clone(),
            path: self.path.clone(),
            method: self.method,
            summary: self.summary.clone(),
            tags: self.tags.clone(),
            response_model: self.response_model.clone(),
            request_model: self.request_model.clone(),
        }
    }
}

/// The public description of an endpoint, as returned by
/// [`EndpointRegistry::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    /// Unique key.
    pub operation_id: String,
    /// Fully qualified path template.
    pub path: String,
    /// HTTP method.
    pub method: Method,
    /// Human summary.
    pub summary: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Response model name.
    pub response_model: Option<String>,
    /// Request model name.
    pub request_model: Option<String>,
}

/// A debug view of a record, including the handler.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryEntry {
    /// Public fields.
    #[serde(flatten)]
    pub endpoint: EndpointDescriptor,
    /// Handler name.
    pub handler: String,
    /// Descriptor table, if the handler is live.
    pub signature: Option<Signature>,
}

// ─────────────────────────────────────────────────────────────────────────────
// EndpointRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Operation id to endpoint record.
#[derive(Default)]
pub struct EndpointRegistry {
    records: RwLock<IndexMap<String, EndpointRecord>>,
}

impl fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRegistry")
            .field("operation_ids", &self.operation_ids())
            .finish()
    }
}

impl EndpointRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry behind an `Arc`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Registers a record, returning the one it replaced.
    pub fn register(&self, record: EndpointRecord) -> Option<EndpointRecord> {
        let operation_id = record.operation_id.clone();
        let method = record.method;
        let path = record.path.clone();
        let previous = self.records.write().insert(operation_id.clone(), record);

        if previous.is_some() {
            tracing::debug!(%operation_id, %method, %path, "endpoint re-registered");
        } else {
            tracing::debug!(%operation_id, %method, %path, "endpoint registered");
        }
        previous
    }

    /// Returns the record for `operation_id`.
    #[must_use]
    pub fn lookup(&self, operation_id: &str) -> Option<EndpointRecord> {
        self.records.read().get(operation_id).cloned()
    }

    /// Lists user endpoints in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<EndpointDescriptor> {
        self.records
            .read()
            .values()
            .filter(|record| !is_meta_operation(&record.operation_id))
            .map(EndpointRecord::descriptor)
            .collect()
    }

    /// Returns every entry, bridge endpoints included.
    #[must_use]
    pub fn snapshot(&self) -> IndexMap<String, RegistryEntry> {
        self.records
            .read()
            .iter()
            .map(|(operation_id, record)| {
                let entry = RegistryEntry {
                    endpoint: record.descriptor(),
                    handler: record.handler.name(),
                    signature: record.signature.as_deref().cloned(),
                };
                (operation_id.clone(), entry)
            })
            .collect()
    }

    /// Returns every registered operation id.
    #[must_use]
    pub fn operation_ids(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    /// Returns `true` if `operation_id` is registered.
    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.records.read().contains_key(operation_id)
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Removes every record.
    pub fn clear(&self) {
        let mut records = self.records.write();
        tracing::debug!(count = records.len(), "endpoint registry cleared");
        records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(operation_id: &str, path: &str) -> EndpointRecord {
        EndpointRecord::new(
            operation_id,
            path,
            Method::Get,
            HandlerRef::Native(operation_id.to_string()),
        )
    }

    #[test]
    fn register_and_lookup() {
        let registry = EndpointRegistry::new();
        assert!(registry.register(native("list_users", "/users")).is_none());

        let record = registry.lookup("list_users").unwrap();
        assert_eq!(record.path, "/users");
        assert_eq!(record.summary, "GET /users");
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn last_write_wins_in_place() {
        let registry = EndpointRegistry::new();
        registry.register(native("a", "/a"));
        registry.register(native("b", "/b"));
        let previous = registry.register(native("a", "/a2"));

        assert_eq!(previous.unwrap().path, "/a");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.operation_ids(), ["a", "b"]);
        assert_eq!(registry.lookup("a").unwrap().path, "/a2");
    }

    #[test]
    fn list_excludes_meta_endpoints() {
        let registry = EndpointRegistry::new();
        registry.register(native("get_bridge_endpoints", "/bridge/endpoints"));
        registry.register(native("list_users", "/users"));

        let listed: Vec<_> = registry.list().into_iter().map(|d| d.operation_id).collect();
        assert_eq!(listed, ["list_users"]);
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn descriptor_uses_camel_case() {
        let record = native("list_users", "/users").with_request_model(Some("Query".into()));
        let json = serde_json::to_value(record.descriptor()).unwrap();
        assert_eq!(json["operationId"], "list_users");
        assert_eq!(json["method"], "GET");
        assert_eq!(json["requestModel"], "Query");
        assert!(json["responseModel"].is_null());
    }

    #[test]
    fn snapshot_includes_handler_name() {
        let registry = EndpointRegistry::new();
        registry.register(native("list_users", "/users"));
        let snapshot = registry.snapshot();
        let json = serde_json::to_value(&snapshot["list_users"]).unwrap();
        assert_eq!(json["handler"], "list_users");
        assert_eq!(json["operationId"], "list_users");
    }

    #[test]
    fn clear_empties_registry() {
        let registry = EndpointRegistry::new();
        registry.register(native("a", "/a"));
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains("a"));
    }
}
