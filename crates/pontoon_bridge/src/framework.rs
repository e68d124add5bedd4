//! The host web framework, reduced to what the bridge needs.
//!
//! [`Application`] and [`Router`] declare routes and nest routers the way an
//! HTTP framework does; matching requests against them is the host's job and
//! lives elsewhere. The bridge only needs to see each declaration, which it
//! does either by wrapping the application ([`BridgeApp`](crate::BridgeApp))
//! or through the process-wide [`RouteObserver`] extension point.

use crate::handler::Handler;
use crate::signature::Signature;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

// ─────────────────────────────────────────────────────────────────────────────
// Method
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
    /// `HEAD`
    Head,
}

impl Method {
    /// Every method, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Options,
        Self::Head,
    ];

    /// Returns the uppercase method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == upper)
            .ok_or_else(|| format!("unknown HTTP method `{s}`"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Route declarations
// ─────────────────────────────────────────────────────────────────────────────

/// Per-route options, the analog of a route decorator's keyword arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Explicit operation id.
    pub operation_id: Option<String>,
    /// Explicit summary.
    pub summary: Option<String>,
    /// Route tags.
    pub tags: Vec<String>,
    /// Explicit response model name.
    pub response_model: Option<String>,
}

impl RouteOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operation id.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Appends a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the response model name.
    #[must_use]
    pub fn with_response_model(mut self, model: impl Into<String>) -> Self {
        self.response_model = Some(model.into());
        self
    }
}

/// A bare string is taken as the operation id.
impl From<&str> for RouteOptions {
    fn from(operation_id: &str) -> Self {
        Self::new().with_operation_id(operation_id)
    }
}

impl From<String> for RouteOptions {
    fn from(operation_id: String) -> Self {
        Self::new().with_operation_id(operation_id)
    }
}

/// What a route dispatches to.
#[derive(Clone)]
pub enum RouteEndpoint {
    /// A handler the bridge can call.
    Handler(Arc<dyn Handler>),
    /// A route the host serves itself (static files, websockets, ...).
    /// It has a name but nothing the bridge can invoke.
    Native(String),
}

impl RouteEndpoint {
    /// Wraps an already shared handler.
    pub fn shared(handler: Arc<dyn Handler>) -> Self {
        Self::Handler(handler)
    }

    /// Creates a host-served endpoint.
    pub fn native(name: impl Into<String>) -> Self {
        Self::Native(name.into())
    }

    /// Returns the handler's declared name, if it has a non-empty one.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        let name = match self {
            Self::Handler(handler) => handler.signature().name,
            Self::Native(name) => name.clone(),
        };
        (!name.is_empty()).then_some(name)
    }

    /// Returns the handler's signature; host-served endpoints have none.
    #[must_use]
    pub fn signature(&self) -> Option<Signature> {
        match self {
            Self::Handler(handler) => Some(handler.signature()),
            Self::Native(_) => None,
        }
    }
}

impl<H: Handler> From<H> for RouteEndpoint {
    fn from(handler: H) -> Self {
        Self::Handler(Arc::new(handler))
    }
}

impl fmt::Debug for RouteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(handler) => f
                .debug_tuple("Handler")
                .field(&handler.signature().name)
                .finish(),
            Self::Native(name) => f.debug_tuple("Native").field(name).finish(),
        }
    }
}

/// A declared route.
#[derive(Debug, Clone)]
pub struct Route {
    /// HTTP method.
    pub method: Method,
    /// Path, including the declaring router's own prefix.
    pub path: String,
    /// Dispatch target.
    pub endpoint: RouteEndpoint,
    /// Declaration options.
    pub options: RouteOptions,
}

/// A router nested under a prefix.
#[derive(Debug, Clone)]
pub struct Mount {
    /// Mount prefix, including the parent router's own prefix.
    pub prefix: String,
    /// Tags applied to every route below the mount.
    pub tags: Vec<String>,
    /// The nested router.
    pub router: Router,
}

/// Options for including a router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeOptions {
    /// Mount prefix.
    pub prefix: String,
    /// Tags added to every included route.
    pub tags: Vec<String>,
}

impl IncludeOptions {
    /// Creates options with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tags: Vec::new(),
        }
    }

    /// Appends a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

impl From<&str> for IncludeOptions {
    fn from(prefix: &str) -> Self {
        Self::new(prefix)
    }
}

/// Joins a prefix and a path with exactly one `/` between them.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if path.is_empty() {
        return prefix.to_string();
    }
    if prefix.is_empty() {
        return path.to_string();
    }
    if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

pub(crate) fn merge_tags(outer: &[String], inner: &[String]) -> Vec<String> {
    let mut tags = outer.to_vec();
    for tag in inner {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

macro_rules! method_helpers {
    ($ret:ty; $($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Declares a `", stringify!($method), "` route.")]
            pub fn $name(
                &mut self,
                path: &str,
                options: impl Into<RouteOptions>,
                endpoint: impl Into<RouteEndpoint>,
            ) -> $ret {
                self.route(Method::$method, path, options, endpoint)
            }
        )*
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// A group of routes that can be included into an application or into
/// another router.
#[derive(Debug, Clone, Default)]
pub struct Router {
    prefix: String,
    tags: Vec<String>,
    routes: Vec<Route>,
    mounts: Vec<Mount>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the router's own prefix, applied to routes declared afterwards.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets tags applied to every route of this router.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the router's own prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Declares a route.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        options: impl Into<RouteOptions>,
        endpoint: impl Into<RouteEndpoint>,
    ) -> &mut Self {
        let mut options = options.into();
        options.tags = merge_tags(&self.tags, &options.tags);
        self.routes.push(Route {
            method,
            path: join_paths(&self.prefix, path),
            endpoint: endpoint.into(),
            options,
        });
        self
    }

    method_helpers!(&mut Self;
        get => Get,
        post => Post,
        put => Put,
        patch => Patch,
        delete => Delete,
        options => Options,
        head => Head,
    );

    /// Nests `router` below `options.prefix`.
    ///
    /// The child keeps its own structure; it is not flattened into this
    /// router's routes.
    pub fn include_router(
        &mut self,
        router: Router,
        options: impl Into<IncludeOptions>,
    ) -> &mut Self {
        let options = options.into();
        self.mounts.push(Mount {
            prefix: join_paths(&self.prefix, &options.prefix),
            tags: merge_tags(&self.tags, &options.tags),
            router,
        });
        self
    }

    /// Returns the routes declared directly on this router.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the routers nested in this router.
    #[must_use]
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application
// ─────────────────────────────────────────────────────────────────────────────

/// The framework application.
#[derive(Debug, Clone)]
pub struct Application {
    title: String,
    observed: bool,
    routes: Vec<Route>,
    mounts: Vec<Mount>,
}

impl Application {
    /// Creates an application that reports declarations to the installed
    /// [`RouteObserver`], if any.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            observed: true,
            routes: Vec::new(),
            mounts: Vec::new(),
        }
    }

    /// Enables or disables reporting to the route observer.
    #[must_use]
    pub fn with_observer(mut self, observed: bool) -> Self {
        self.observed = observed;
        self
    }

    /// Returns the application title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Declares a route.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        options: impl Into<RouteOptions>,
        endpoint: impl Into<RouteEndpoint>,
    ) -> &mut Self {
        let route = Route {
            method,
            path: path.to_string(),
            endpoint: endpoint.into(),
            options: options.into(),
        };
        if let Some(observer) = self.observer() {
            observer.on_route(&route);
        }
        self.routes.push(route);
        self
    }

    method_helpers!(&mut Self;
        get => Get,
        post => Post,
        put => Put,
        patch => Patch,
        delete => Delete,
        options => Options,
        head => Head,
    );

    /// Mounts `router` below `options.prefix`.
    pub fn include_router(
        &mut self,
        router: Router,
        options: impl Into<IncludeOptions>,
    ) -> &mut Self {
        let options = options.into();
        if let Some(observer) = self.observer() {
            observer.on_include(&router, &options);
        }
        self.mounts.push(Mount {
            prefix: options.prefix,
            tags: options.tags,
            router,
        });
        self
    }

    /// Returns every reachable route with fully qualified paths.
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        let mut routes = self.routes.clone();
        for mount in &self.mounts {
            flatten(&mount.prefix, &mount.tags, &mount.router, &mut routes);
        }
        routes
    }

    /// Returns the mounted routers.
    #[must_use]
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    fn observer(&self) -> Option<&'static Arc<dyn RouteObserver>> {
        if self.observed { route_observer() } else { None }
    }
}

fn flatten(prefix: &str, tags: &[String], router: &Router, out: &mut Vec<Route>) {
    for route in router.routes() {
        let mut route = route.clone();
        route.path = join_paths(prefix, &route.path);
        route.options.tags = merge_tags(tags, &route.options.tags);
        out.push(route);
    }
    for mount in router.mounts() {
        let tags = merge_tags(tags, &mount.tags);
        flatten(&join_paths(prefix, &mount.prefix), &tags, &mount.router, out);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observer extension point
// ─────────────────────────────────────────────────────────────────────────────

/// Receives route declarations made on any observed [`Application`].
pub trait RouteObserver: Send + Sync + 'static {
    /// Called before a route is added to an application.
    fn on_route(&self, route: &Route);

    /// Called before a router is mounted on an application.
    fn on_include(&self, router: &Router, options: &IncludeOptions);
}

static ROUTE_OBSERVER: OnceLock<Arc<dyn RouteObserver>> = OnceLock::new();

/// Installs the process-wide route observer.
///
/// Returns `false` if one was already installed; the first one stays.
pub fn set_route_observer(observer: Arc<dyn RouteObserver>) -> bool {
    ROUTE_OBSERVER.set(observer).is_ok()
}

/// Returns the installed route observer.
#[must_use]
pub fn route_observer() -> Option<&'static Arc<dyn RouteObserver>> {
    ROUTE_OBSERVER.get()
}
