//! Route interception.
//!
//! The [`Interceptor`] turns route declarations into registry records.
//! [`BridgeApp`] is the primary way to use it: a drop-in wrapper around
//! [`Application`] whose route methods record each route **before**
//! delegating, and whose `include_router` records every route of the
//! included router tree with fully composed paths.
//!
//! # Example
//!
//! ```
//! use pontoon_bridge::{BridgeApp, RouteEndpoint, Router};
//!
//! let mut users = Router::new();
//! users.get("/users", "list_users", RouteEndpoint::native("list_users"));
//!
//! let mut app = BridgeApp::new("demo");
//! app.include_router(users, "/api/v1");
//!
//! assert_eq!(app.endpoints()[0].path, "/api/v1/users");
//! ```

use crate::error::RegistrationError;
use crate::framework::{
    Application, IncludeOptions, Method, Route, RouteEndpoint, RouteObserver, RouteOptions,
    Router, join_paths, merge_tags,
};
use crate::invoke::Invoker;
use crate::meta;
use crate::registry::{EndpointDescriptor, EndpointRecord, EndpointRegistry, HandlerRef};
use crate::signature::{ParamDefault, ParamLocation, Signature};
use pontoon_core::{BridgeSettings, OperationIdPolicy};
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Interceptor
// ─────────────────────────────────────────────────────────────────────────────

/// Records route declarations into an [`EndpointRegistry`].
#[derive(Debug, Clone)]
pub struct Interceptor {
    registry: Arc<EndpointRegistry>,
    policy: OperationIdPolicy,
}

impl Interceptor {
    /// Creates an interceptor writing to `registry`.
    #[must_use]
    pub fn new(registry: Arc<EndpointRegistry>, policy: OperationIdPolicy) -> Self {
        Self { registry, policy }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Returns the operation-id policy.
    #[must_use]
    pub fn policy(&self) -> OperationIdPolicy {
        self.policy
    }

    /// Determines the operation id of a route under the current policy.
    ///
    /// # Errors
    ///
    /// Under [`OperationIdPolicy::Strict`], a route without an explicit id
    /// fails with [`RegistrationError::MissingOperationId`]. Under
    /// [`OperationIdPolicy::Lenient`] the handler name is used, and a handler
    /// without one fails with [`RegistrationError::UnnamedHandler`].
    pub fn operation_id(
        &self,
        method: Method,
        path: &str,
        options: &RouteOptions,
        endpoint: &RouteEndpoint,
    ) -> Result<String, RegistrationError> {
        if let Some(operation_id) = &options.operation_id {
            return Ok(operation_id.clone());
        }
        match self.policy {
            OperationIdPolicy::Strict => Err(RegistrationError::MissingOperationId {
                method,
                path: path.to_string(),
            }),
            OperationIdPolicy::Lenient => {
                endpoint
                    .name()
                    .ok_or_else(|| RegistrationError::UnnamedHandler {
                        method,
                        path: path.to_string(),
                    })
            }
        }
    }

    /// Records one route.
    ///
    /// # Errors
    ///
    /// See [`Interceptor::operation_id`].
    pub fn capture_route(
        &self,
        method: Method,
        path: &str,
        options: &RouteOptions,
        endpoint: &RouteEndpoint,
    ) -> Result<EndpointRecord, RegistrationError> {
        let operation_id = self.operation_id(method, path, options, endpoint)?;
        let record = build_record(operation_id, method, path, options, endpoint);
        self.registry.register(record.clone());
        Ok(record)
    }

    /// Records every route of `router` and of the routers nested in it,
    /// below `prefix`, returning how many were recorded.
    ///
    /// Routes whose operation id cannot be determined are skipped with a
    /// warning.
    pub fn capture_router(&self, router: &Router, prefix: &str, tags: &[String]) -> usize {
        let mut count = 0;

        for route in router.routes() {
            let path = join_paths(prefix, &route.path);
            let mut options = route.options.clone();
            options.tags = merge_tags(tags, &options.tags);

            match self.capture_route(route.method, &path, &options, &route.endpoint) {
                Ok(_) => count += 1,
                Err(err) => {
                    tracing::warn!(method = %route.method, %path, error = %err, "route not recorded");
                }
            }
        }

        for mount in router.mounts() {
            let tags = merge_tags(tags, &mount.tags);
            count += self.capture_router(&mount.router, &join_paths(prefix, &mount.prefix), &tags);
        }

        count
    }
}

impl RouteObserver for Interceptor {
    fn on_route(&self, route: &Route) {
        if let Err(err) =
            self.capture_route(route.method, &route.path, &route.options, &route.endpoint)
        {
            tracing::warn!(method = %route.method, path = %route.path, error = %err, "route not recorded");
        }
    }

    fn on_include(&self, router: &Router, options: &IncludeOptions) {
        let count = self.capture_router(router, &options.prefix, &options.tags);
        tracing::debug!(prefix = %options.prefix, count, "router recorded");
    }
}

fn build_record(
    operation_id: String,
    method: Method,
    path: &str,
    options: &RouteOptions,
    endpoint: &RouteEndpoint,
) -> EndpointRecord {
    let handler = match endpoint {
        RouteEndpoint::Handler(handler) => HandlerRef::Live(Arc::clone(handler)),
        RouteEndpoint::Native(name) => HandlerRef::Native(name.clone()),
    };
    let mut record = EndpointRecord::new(operation_id, path, method, handler);

    let signature = record.signature.clone();
    if let Some(summary) = options
        .summary
        .clone()
        .or_else(|| signature.as_ref().and_then(|sig| sig.doc.clone()))
    {
        record.summary = summary;
    }

    record
        .with_tags(options.tags.clone())
        .with_response_model(
            options
                .response_model
                .clone()
                .or_else(|| signature.as_ref().and_then(|sig| sig.returns.clone())),
        )
        .with_request_model(signature.as_deref().and_then(request_model))
}

/// The first structured, non-injected parameter type that is not read from
/// the query, path or headers.
fn request_model(signature: &Signature) -> Option<String> {
    signature
        .params
        .iter()
        .filter(|param| match &param.default {
            ParamDefault::Dependency(_) => false,
            ParamDefault::Spec(spec) => spec.location == ParamLocation::Body,
            ParamDefault::Required | ParamDefault::Plain(_) => true,
        })
        .find_map(|param| param.ty.model_name().map(str::to_string))
}

// ─────────────────────────────────────────────────────────────────────────────
// BridgeApp
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! bridge_method_helpers {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Records and declares a `", stringify!($method), "` route.")]
            ///
            /// # Errors
            ///
            /// See [`BridgeApp::route`].
            pub fn $name(
                &mut self,
                path: &str,
                options: impl Into<RouteOptions>,
                endpoint: impl Into<RouteEndpoint>,
            ) -> Result<&mut Self, RegistrationError> {
                self.route(Method::$method, path, options, endpoint)
            }
        )*
    };
}

/// An [`Application`] that records every route it declares.
#[derive(Debug)]
pub struct BridgeApp {
    app: Application,
    interceptor: Interceptor,
    settings: BridgeSettings,
}

impl BridgeApp {
    /// Creates an app with default settings and its own registry.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_settings(title, BridgeSettings::default())
    }

    /// Creates an app with the given settings and its own registry.
    pub fn with_settings(title: impl Into<String>, settings: BridgeSettings) -> Self {
        Self::with_registry(title, settings, EndpointRegistry::shared())
    }

    /// Creates an app writing into an existing registry.
    pub fn with_registry(
        title: impl Into<String>,
        settings: BridgeSettings,
        registry: Arc<EndpointRegistry>,
    ) -> Self {
        let interceptor = Interceptor::new(registry, settings.id_policy());
        let mut app = Self {
            app: Application::new(title).with_observer(false),
            interceptor,
            settings,
        };
        app.declare_meta_routes();
        app
    }

    fn declare_meta_routes(&mut self) {
        for route in meta::routes(self.interceptor.registry(), &self.settings) {
            let options = RouteOptions::from(route.operation_id).with_tag("bridge");
            let record = build_record(
                route.operation_id.to_string(),
                route.method,
                route.path,
                &options,
                &route.endpoint,
            );
            self.interceptor.registry().register(record);
            self.app
                .route(route.method, route.path, options, route.endpoint);
        }
    }

    /// Records a route, then declares it on the wrapped application.
    ///
    /// # Errors
    ///
    /// Fails when the route's operation id cannot be determined under the
    /// configured policy; nothing is declared in that case.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        options: impl Into<RouteOptions>,
        endpoint: impl Into<RouteEndpoint>,
    ) -> Result<&mut Self, RegistrationError> {
        let options = options.into();
        let endpoint = endpoint.into();
        self.interceptor
            .capture_route(method, path, &options, &endpoint)?;
        self.app.route(method, path, options, endpoint);
        Ok(self)
    }

    bridge_method_helpers!(
        get => Get,
        post => Post,
        put => Put,
        patch => Patch,
        delete => Delete,
        options => Options,
        head => Head,
    );

    /// Mounts `router`, then records every route in it.
    pub fn include_router(
        &mut self,
        router: Router,
        options: impl Into<IncludeOptions>,
    ) -> &mut Self {
        self.app.include_router(router, options);
        if let Some(mount) = self.app.mounts().last() {
            let count = self
                .interceptor
                .capture_router(&mount.router, &mount.prefix, &mount.tags);
            tracing::debug!(prefix = %mount.prefix, count, "router recorded");
        }
        self
    }

    /// Returns the wrapped application.
    #[must_use]
    pub fn application(&self) -> &Application {
        &self.app
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        self.interceptor.registry()
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Returns an invoker over this app's registry.
    #[must_use]
    pub fn invoker(&self) -> Invoker {
        Invoker::new(Arc::clone(self.registry()), self.settings.clone())
    }

    /// Lists user endpoints.
    #[must_use]
    pub fn endpoints(&self) -> Vec<EndpointDescriptor> {
        self.registry().list()
    }

    /// Clears the registry, bridge endpoints included.
    pub fn clear_registry(&self) {
        self.registry().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depends::Depends;
    use crate::frame::CallFrame;
    use crate::handler::{Handler, HandlerFuture};
    use crate::signature::{DeclaredType, Parameter, ParamSpec};
    use pontoon_object::Node;

    struct CreatePost;

    impl Handler for CreatePost {
        fn signature(&self) -> Signature {
            Signature::new("create_post")
                .with_doc("Create a post.")
                .with_param(
                    Parameter::new("db", DeclaredType::Other("Session".into()))
                        .with_default(Depends::new(|| ()).into()),
                )
                .with_param(
                    Parameter::new("filter", DeclaredType::Other("Filter".into()))
                        .with_default(ParamSpec::query().into()),
                )
                .with_param(Parameter::new("post", DeclaredType::Other("PostCreate".into())))
                .with_returns("Post")
        }

        fn call(&self, _frame: CallFrame) -> HandlerFuture<'_> {
            Box::pin(async { Ok(Node::Null) })
        }
    }

    fn lenient() -> Interceptor {
        Interceptor::new(EndpointRegistry::shared(), OperationIdPolicy::Lenient)
    }

    #[test]
    fn strict_requires_explicit_id() {
        let interceptor = Interceptor::new(EndpointRegistry::shared(), OperationIdPolicy::Strict);
        let err = interceptor
            .capture_route(
                Method::Post,
                "/posts",
                &RouteOptions::new(),
                &CreatePost.into(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::MissingOperationId { .. }));
        assert!(interceptor.registry().is_empty());
    }

    #[test]
    fn lenient_falls_back_to_handler_name() {
        let interceptor = lenient();
        let record = interceptor
            .capture_route(
                Method::Post,
                "/posts",
                &RouteOptions::new(),
                &CreatePost.into(),
            )
            .unwrap();
        assert_eq!(record.operation_id, "create_post");

        let err = interceptor
            .capture_route(
                Method::Get,
                "/x",
                &RouteOptions::new(),
                &RouteEndpoint::native(""),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UnnamedHandler { .. }));
    }

    #[test]
    fn record_metadata_is_extracted() {
        let record = lenient()
            .capture_route(
                Method::Post,
                "/posts",
                &RouteOptions::new().with_tag("posts"),
                &CreatePost.into(),
            )
            .unwrap();

        assert_eq!(record.summary, "Create a post.");
        assert_eq!(record.tags, ["posts"]);
        assert_eq!(record.request_model.as_deref(), Some("PostCreate"));
        assert_eq!(record.response_model.as_deref(), Some("Post"));
    }

    #[test]
    fn explicit_options_win() {
        let record = lenient()
            .capture_route(
                Method::Post,
                "/posts",
                &RouteOptions::from("new_post")
                    .with_summary("Make one")
                    .with_response_model("PostOut"),
                &CreatePost.into(),
            )
            .unwrap();

        assert_eq!(record.operation_id, "new_post");
        assert_eq!(record.summary, "Make one");
        assert_eq!(record.response_model.as_deref(), Some("PostOut"));
    }

    #[test]
    fn native_summary_defaults_to_method_and_path() {
        let record = lenient()
            .capture_route(
                Method::Get,
                "/static",
                &RouteOptions::new(),
                &RouteEndpoint::native("static_files"),
            )
            .unwrap();
        assert_eq!(record.summary, "GET /static");
        assert_eq!(record.request_model, None);
    }

    #[test]
    fn router_walk_composes_prefixes_and_skips_unnamed() {
        let interceptor = Interceptor::new(EndpointRegistry::shared(), OperationIdPolicy::Strict);

        let mut inner = Router::new().with_tags(["admin"]);
        inner.get("/users", "list_admin_users", RouteEndpoint::native("list_admin_users"));
        inner.get("/audit", RouteOptions::new(), RouteEndpoint::native("audit"));

        let mut outer = Router::new();
        outer.include_router(inner, "/admin");

        let count = interceptor.capture_router(&outer, "/api/v1", &["v1".to_string()]);
        assert_eq!(count, 1);

        let record = interceptor.registry().lookup("list_admin_users").unwrap();
        assert_eq!(record.path, "/api/v1/admin/users");
        assert_eq!(record.tags, ["v1", "admin"]);
    }

    #[test]
    fn bridge_app_registers_meta_endpoints() {
        let app = BridgeApp::new("demo");
        assert_eq!(app.registry().len(), 3);
        assert!(app.endpoints().is_empty());
        assert_eq!(app.application().routes().len(), 3);

        app.clear_registry();
        assert!(app.registry().is_empty());
    }

    #[test]
    fn bridge_app_fails_fast_under_strict_policy() {
        let mut app = BridgeApp::new("demo");
        let result = app.post("/posts", RouteOptions::new(), CreatePost);
        assert!(result.is_err());
        assert_eq!(app.application().routes().len(), 3);

        app.post("/posts", "create_post", CreatePost).unwrap();
        assert_eq!(app.endpoints().len(), 1);
        assert_eq!(app.application().routes().len(), 4);
    }
}
