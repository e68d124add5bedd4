//! Process-wide interception.
//!
//! After [`enable`], every observed [`Application`](crate::Application)
//! records its routes into the given registry without being wrapped in a
//! [`BridgeApp`](crate::BridgeApp). Installation is one-shot: the first
//! registry wins for the life of the process.

use crate::framework::{route_observer, set_route_observer};
use crate::interceptor::Interceptor;
use crate::registry::EndpointRegistry;
use pontoon_core::OperationIdPolicy;
use std::sync::Arc;

/// Installs a lenient interceptor over `registry`.
///
/// Returns `false` if interception was already enabled.
pub fn enable(registry: Arc<EndpointRegistry>) -> bool {
    enable_with_policy(registry, OperationIdPolicy::Lenient)
}

/// Installs an interceptor over `registry` with the given policy.
///
/// Under [`OperationIdPolicy::Strict`], routes declared without an
/// operation id are logged and left unrecorded; the declaration itself
/// still succeeds.
pub fn enable_with_policy(registry: Arc<EndpointRegistry>, policy: OperationIdPolicy) -> bool {
    let installed = set_route_observer(Arc::new(Interceptor::new(registry, policy)));
    if installed {
        tracing::info!(policy = policy.as_str(), "global route interception enabled");
    } else {
        tracing::warn!("global route interception was already enabled");
    }
    installed
}

/// Returns `true` once interception has been enabled.
#[must_use]
pub fn is_enabled() -> bool {
    route_observer().is_some()
}
