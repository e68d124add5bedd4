//! Error types for registration, binding, execution and runtime bridging.

use crate::framework::Method;
use core::fmt;
use pontoon_object::short_type_name;
use std::any::type_name;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use thiserror::Error;

/// Errors raised while declaring routes.
///
/// These surface at application-construction time, never at request time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The strict policy requires an explicit operation id.
    #[error(
        "Route {method} {path} has no operation id; \
         pass one explicitly or switch to the lenient policy"
    )]
    MissingOperationId {
        /// Route method.
        method: Method,
        /// Route path.
        path: String,
    },

    /// The lenient policy found no handler name to fall back to.
    #[error("Cannot derive an operation id for {method} {path}: the handler has no name")]
    UnnamedHandler {
        /// Route method.
        method: Method,
        /// Route path.
        path: String,
    },
}

/// Errors raised while binding a resolved call frame to handler arguments.
#[derive(Debug, Error)]
pub enum BindError {
    /// The parameter was not resolved and its type has no absent value.
    #[error("Missing required argument '{param}'")]
    Missing {
        /// Parameter name.
        param: String,
    },

    /// The resolved value could not be converted to the parameter type.
    #[error("Invalid value for argument '{param}': {source}")]
    Invalid {
        /// Parameter name.
        param: String,
        /// Conversion error.
        #[source]
        source: serde_json::Error,
    },

    /// An injected value has a different type than the parameter.
    #[error("Injected argument '{param}' is not a {expected}")]
    TypeMismatch {
        /// Parameter name.
        param: String,
        /// Expected type name.
        expected: &'static str,
    },
}

/// Errors raised while driving a future to completion outside an async
/// context.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A transient runtime could not be started.
    #[error("Failed to start a transient runtime: {0}")]
    Build(#[from] std::io::Error),

    /// The worker thread driving the future panicked.
    #[error("Runtime worker thread panicked")]
    WorkerPanicked,
}

/// A host value could not be unwrapped into JSON.
#[derive(Debug, Error)]
#[error("Foreign value could not be converted: {0}")]
pub struct ForeignError(pub String);

/// A client-facing error carrying its own HTTP status.
///
/// Returned from a handler, it is passed through as
/// `{"detail": <detail>}` with `status_code`, without wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct HttpException {
    /// HTTP status code.
    pub status_code: u16,
    /// Human-readable message.
    pub detail: String,
}

impl HttpException {
    /// Creates an exception with the given status and message.
    pub fn new(status_code: u16, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            detail: detail.into(),
        }
    }

    /// Creates a `400 Bad Request`.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, detail)
    }

    /// Creates a `404 Not Found`.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, detail)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HandlerError
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for Message {}

/// The error a handler call fails with.
///
/// Any `std::error::Error + Send + Sync + 'static` converts into it with `?`.
/// The concrete type name becomes the error kind reported to callers, and a
/// backtrace is captured at conversion (subject to `RUST_BACKTRACE`).
///
/// `HandlerError` does not implement [`Error`]; the blanket conversion would
/// otherwise overlap with the reflexive `From`.
pub struct HandlerError {
    kind: &'static str,
    inner: Box<dyn Error + Send + Sync + 'static>,
    backtrace: Backtrace,
}

impl<E> From<E> for HandlerError
where
    E: Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self {
            kind: type_name::<E>(),
            inner: Box::new(err),
            backtrace: Backtrace::capture(),
        }
    }
}

impl HandlerError {
    /// Creates an error from a plain message, reported with kind `Error`.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            kind: "Error",
            inner: Box::new(Message(message.into())),
            backtrace: Backtrace::capture(),
        }
    }

    /// Returns the short type name of the original error.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        short_type_name(self.kind)
    }

    /// Returns the client-facing exception, if one was raised.
    ///
    /// The whole source chain is searched, so a handler error type that
    /// carries an [`HttpException`] as its `#[source]` is recognized too. An
    /// `#[error(transparent)]` variant forwards `source()` past the wrapped
    /// value and hides it.
    #[must_use]
    pub fn http_exception(&self) -> Option<&HttpException> {
        self.chain().find_map(|err| err.downcast_ref::<HttpException>())
    }

    /// Returns the original error if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Iterates over the error and its sources.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn Error + 'static)> {
        let first: &(dyn Error + 'static) = self.inner.as_ref();
        std::iter::successors(Some(first), |&err| err.source())
    }

    /// Returns the captured backtrace.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Renders the error chain and up to `max_frames` backtrace frames.
    #[must_use]
    pub fn traceback(&self, max_frames: usize) -> String {
        let mut out = format!("{}: {}", self.kind(), self.inner);
        for cause in self.chain().skip(1) {
            out.push_str("\nCaused by: ");
            out.push_str(&cause.to_string());
        }

        if self.backtrace.status() == BacktraceStatus::Captured {
            out.push_str("\nBacktrace:\n");
            let rendered = self.backtrace.to_string();
            // Each frame prints as a symbol line followed by a location line.
            for line in rendered.lines().take(max_frames.saturating_mul(2)) {
                out.push_str(line);
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("kind", &self.kind)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
