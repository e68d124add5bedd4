//! Driving futures to completion from synchronous callers.
//!
//! An embedded host calls the bridge synchronously and may or may not
//! already be inside an executor. [`run_to_completion`] picks how to drive a
//! future for the situation it finds:
//!
//! | Situation | Strategy |
//! |-----------|----------|
//! | embedded environment | `futures::executor::block_on` on the calling thread |
//! | inside a multi-thread tokio runtime | `block_in_place` + `Handle::block_on` |
//! | inside a current-thread tokio runtime | transient runtime on a scoped worker thread |
//! | no runtime | transient current-thread runtime, torn down afterwards |

use crate::error::RuntimeError;
use pontoon_core::Environment;
use std::future::Future;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};

/// The executor situation of the calling thread.
#[derive(Debug, Clone)]
pub enum LoopStrategy {
    /// A tokio runtime is active on this thread.
    Active(Handle),
    /// No runtime; one must be started for the call.
    Transient,
}

impl LoopStrategy {
    /// Inspects the calling thread.
    #[must_use]
    pub fn detect() -> Self {
        match Handle::try_current() {
            Ok(handle) => Self::Active(handle),
            Err(_) => Self::Transient,
        }
    }
}

/// Runs `future` to completion and returns its output.
///
/// # Errors
///
/// Returns [`RuntimeError::Build`] if a transient runtime cannot be started
/// and [`RuntimeError::WorkerPanicked`] if the worker thread driving the
/// future panics.
pub fn run_to_completion<F>(environment: Environment, future: F) -> Result<F::Output, RuntimeError>
where
    F: Future + Send,
    F::Output: Send,
{
    if environment.is_embedded() {
        tracing::trace!("driving future on the embedded executor");
        return Ok(futures::executor::block_on(future));
    }

    match LoopStrategy::detect() {
        LoopStrategy::Active(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tracing::trace!("driving future on the active runtime");
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        LoopStrategy::Active(_) => {
            tracing::trace!("driving future on a scoped worker thread");
            std::thread::scope(|scope| {
                scope
                    .spawn(move || block_on_transient(future))
                    .join()
                    .unwrap_or(Err(RuntimeError::WorkerPanicked))
            })
        }
        LoopStrategy::Transient => {
            tracing::trace!("driving future on a transient runtime");
            block_on_transient(future)
        }
    }
}

fn block_on_transient<F: Future>(future: F) -> Result<F::Output, RuntimeError> {
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_runtime_starts_a_transient_one() {
        assert!(matches!(LoopStrategy::detect(), LoopStrategy::Transient));
        let value = run_to_completion(Environment::Server, async { 21 * 2 }).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn embedded_uses_the_calling_thread() {
        let value = run_to_completion(Environment::Embedded, async { "done" }).unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn inside_multi_thread_runtime() {
        assert!(matches!(LoopStrategy::detect(), LoopStrategy::Active(_)));
        let value = run_to_completion(Environment::Server, async {
            tokio::task::yield_now().await;
            7
        })
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn inside_current_thread_runtime() {
        let value = run_to_completion(Environment::Server, async {
            tokio::task::yield_now().await;
            "worker"
        })
        .unwrap();
        assert_eq!(value, "worker");
    }
}
