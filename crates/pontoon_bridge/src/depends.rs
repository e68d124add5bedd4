//! Dependency markers.
//!
//! A [`Depends`] wraps a zero-argument provider. The provider can be a plain
//! function, one returning a future, or one returning an iterator; for the
//! last kind only the first item is used and the rest of the iterator,
//! including any teardown it would run, is dropped without being polled.

use core::fmt;
use futures::FutureExt;
use futures::future::BoxFuture;
use pontoon_object::short_type_name;
use serde::{Serialize, Serializer};
use std::any::{Any, type_name};
use std::future::Future;
use std::sync::Arc;

/// A type-erased resolved dependency.
pub type Injected = Box<dyn Any + Send>;

type SyncProvider = Box<dyn Fn() -> Injected + Send + Sync>;
type AsyncProvider = Box<dyn Fn() -> BoxFuture<'static, Injected> + Send + Sync>;
type GeneratorProvider = Box<dyn Fn() -> Box<dyn Iterator<Item = Injected> + Send> + Send + Sync>;

enum Provider {
    Sync(SyncProvider),
    Async(AsyncProvider),
    Generator(GeneratorProvider),
}

/// How a dependency provider produces its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Returns the value directly.
    Sync,
    /// Returns a future of the value.
    Async,
    /// Returns an iterator whose first item is the value.
    Generator,
}

/// A dependency-injection marker.
///
/// # Example
///
/// ```
/// use pontoon_bridge::Depends;
///
/// fn settings() -> &'static str {
///     "production"
/// }
///
/// let depends = Depends::new(settings);
/// assert_eq!(depends.name(), "settings");
/// ```
#[derive(Clone)]
pub struct Depends {
    name: String,
    provider: Arc<Provider>,
}

impl Depends {
    /// Wraps a synchronous provider.
    pub fn new<F, T>(provider: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        Self::with_provider::<F>(Provider::Sync(Box::new(move || {
            Box::new(provider()) as Injected
        })))
    }

    /// Wraps a provider returning a future.
    pub fn future<F, Fut, T>(provider: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Self::with_provider::<F>(Provider::Async(Box::new(move || {
            provider().map(|value| Box::new(value) as Injected).boxed()
        })))
    }

    /// Wraps a provider returning an iterator; its first item is the value.
    pub fn generator<F, I, T>(provider: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: Send + 'static,
    {
        Self::with_provider::<F>(Provider::Generator(Box::new(move || {
            Box::new(
                provider()
                    .into_iter()
                    .map(|value| Box::new(value) as Injected),
            )
        })))
    }

    fn with_provider<F>(provider: Provider) -> Self {
        Self {
            name: short_type_name(type_name::<F>()).to_string(),
            provider: Arc::new(provider),
        }
    }

    /// Overrides the provider name. Closures have no useful one.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the provider name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the provider kind.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        match self.provider.as_ref() {
            Provider::Sync(_) => ProviderKind::Sync,
            Provider::Async(_) => ProviderKind::Async,
            Provider::Generator(_) => ProviderKind::Generator,
        }
    }

    /// Calls the provider.
    ///
    /// Returns `None` only for a generator that yields nothing.
    pub async fn resolve(&self) -> Option<Injected> {
        match self.provider.as_ref() {
            Provider::Sync(provider) => Some(provider()),
            Provider::Async(provider) => Some(provider().await),
            Provider::Generator(provider) => provider().next(),
        }
    }
}

impl fmt::Debug for Depends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Depends")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

impl Serialize for Depends {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}
