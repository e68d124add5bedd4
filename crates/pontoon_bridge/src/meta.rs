//! The bridge's own endpoints.
//!
//! [`BridgeApp`](crate::BridgeApp) registers these at construction:
//!
//! | Operation id | Route |
//! |--------------|-------|
//! | `get_bridge_endpoints` | `GET /bridge/endpoints` |
//! | `get_bridge_registry` | `GET /bridge/registry` |
//! | `invoke_bridge_endpoint` | `POST /bridge/invoke/{operation_id}` |
//!
//! They hold the registry weakly: the registry owns their records, so a
//! strong reference would keep it alive forever.

use crate::error::{HandlerError, HttpException};
use crate::frame::CallFrame;
use crate::framework::{Method, RouteEndpoint};
use crate::handler::{Handler, HandlerFuture};
use crate::invoke::{InvokePayload, Invoker};
use crate::registry::EndpointRegistry;
use crate::signature::{DeclaredType, Parameter, ParamSpec, Signature};
use pontoon_core::BridgeSettings;
use pontoon_object::{IntoNode, Json};
use std::sync::{Arc, Weak};

/// A meta endpoint ready to be declared.
pub(crate) struct MetaRoute {
    pub operation_id: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub endpoint: RouteEndpoint,
}

/// Builds the meta endpoints over `registry`.
pub(crate) fn routes(registry: &Arc<EndpointRegistry>, settings: &BridgeSettings) -> Vec<MetaRoute> {
    let weak = Arc::downgrade(registry);
    vec![
        MetaRoute {
            operation_id: "get_bridge_endpoints",
            method: Method::Get,
            path: "/bridge/endpoints",
            endpoint: ListEndpoints {
                registry: weak.clone(),
            }
            .into(),
        },
        MetaRoute {
            operation_id: "get_bridge_registry",
            method: Method::Get,
            path: "/bridge/registry",
            endpoint: RegistrySnapshot {
                registry: weak.clone(),
            }
            .into(),
        },
        MetaRoute {
            operation_id: "invoke_bridge_endpoint",
            method: Method::Post,
            path: "/bridge/invoke/{operation_id}",
            endpoint: InvokeEndpoint {
                registry: weak,
                settings: settings.clone(),
            }
            .into(),
        },
    ]
}

fn upgrade(registry: &Weak<EndpointRegistry>) -> Result<Arc<EndpointRegistry>, HandlerError> {
    registry
        .upgrade()
        .ok_or_else(|| HttpException::new(503, "Endpoint registry is no longer available").into())
}

struct ListEndpoints {
    registry: Weak<EndpointRegistry>,
}

impl Handler for ListEndpoints {
    fn signature(&self) -> Signature {
        Signature::new("get_bridge_endpoints")
            .with_doc("List all registered endpoints.")
            .with_returns("Vec<EndpointDescriptor>")
    }

    fn call(&self, _frame: CallFrame) -> HandlerFuture<'_> {
        Box::pin(async move {
            let registry = upgrade(&self.registry)?;
            Ok(Json(registry.list()).into_node())
        })
    }
}

struct RegistrySnapshot {
    registry: Weak<EndpointRegistry>,
}

impl Handler for RegistrySnapshot {
    fn signature(&self) -> Signature {
        Signature::new("get_bridge_registry")
            .with_doc("Return the full endpoint registry, bridge endpoints included.")
            .with_returns("IndexMap<String, RegistryEntry>")
    }

    fn call(&self, _frame: CallFrame) -> HandlerFuture<'_> {
        Box::pin(async move {
            let registry = upgrade(&self.registry)?;
            Ok(Json(registry.snapshot()).into_node())
        })
    }
}

struct InvokeEndpoint {
    registry: Weak<EndpointRegistry>,
    settings: BridgeSettings,
}

impl Handler for InvokeEndpoint {
    fn signature(&self) -> Signature {
        Signature::new("invoke_bridge_endpoint")
            .with_doc("Invoke any registered endpoint by operation id.")
            .with_async(true)
            .with_param(
                Parameter::new("operation_id", DeclaredType::String)
                    .with_default(ParamSpec::path().into()),
            )
            .with_param(
                Parameter::new("payload", DeclaredType::Other("InvokePayload".to_string()))
                    .with_default(ParamSpec::body().into()),
            )
            .with_returns("Envelope")
    }

    fn call(&self, mut frame: CallFrame) -> HandlerFuture<'_> {
        Box::pin(async move {
            let operation_id: String = frame.take_value("operation_id")?;
            let payload: Option<InvokePayload> = frame.take_value("payload")?;
            let registry = upgrade(&self.registry)?;

            let invoker = Invoker::new(registry, self.settings.clone());
            let request = payload.unwrap_or_default().into_request(operation_id);
            let envelope = invoker.invoke_request(request).await;
            Ok(Json(envelope).into_node())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EndpointRecord, HandlerRef};
    use crate::resolver::Params;
    use serde_json::json;

    fn registry_with_meta() -> Arc<EndpointRegistry> {
        let registry = EndpointRegistry::shared();
        for route in routes(&registry, &BridgeSettings::default()) {
            let RouteEndpoint::Handler(handler) = route.endpoint else {
                panic!("meta endpoints are live");
            };
            registry.register(EndpointRecord::new(
                route.operation_id,
                route.path,
                route.method,
                HandlerRef::Live(handler),
            ));
        }
        registry
    }

    #[tokio::test]
    async fn endpoints_listing_hides_itself() {
        let registry = registry_with_meta();
        let invoker = Invoker::new(registry, BridgeSettings::default());

        let envelope = invoker
            .invoke("get_bridge_endpoints", &Params::new(), &Params::new(), None)
            .await;
        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.content, json!([]));

        let snapshot = invoker
            .invoke("get_bridge_registry", &Params::new(), &Params::new(), None)
            .await;
        assert_eq!(snapshot.content.as_object().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn invoke_endpoint_wraps_inner_envelope() {
        let registry = registry_with_meta();
        let invoker = Invoker::new(registry, BridgeSettings::default());

        let mut path = Params::new();
        path.insert("operation_id".to_string(), json!("missing_op"));
        let envelope = invoker
            .invoke("invoke_bridge_endpoint", &path, &Params::new(), Some(json!({})))
            .await;

        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.content["status_code"], 404);
        assert_eq!(
            envelope.content["content"]["detail"],
            "Operation 'missing_op' not found"
        );
    }

    #[tokio::test]
    async fn dropped_registry_is_503() {
        let registry = registry_with_meta();
        let record = registry.lookup("get_bridge_endpoints").unwrap();
        drop(registry);

        let handler = record.handler.as_live().unwrap();
        let err = handler.call(CallFrame::new()).await.unwrap_err();
        assert_eq!(err.http_exception().unwrap().status_code, 503);
    }
}
