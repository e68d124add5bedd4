//! The [`Handler`] trait implemented by every bridge-callable endpoint.

use crate::error::HandlerError;
use crate::frame::CallFrame;
use crate::signature::Signature;
use pontoon_object::Node;
use std::future::Future;
use std::pin::Pin;

/// The future a handler call returns.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Node, HandlerError>> + Send + 'a>>;

/// An endpoint handler the bridge can invoke out of band.
///
/// Usually generated by [`#[endpoint]`](crate::endpoint) from a plain or
/// `async` function; synchronous handlers simply return a ready future.
pub trait Handler: Send + Sync + 'static {
    /// Returns the handler's parameter descriptor table.
    fn signature(&self) -> Signature;

    /// Binds the frame to the handler's parameters and runs it.
    fn call(&self, frame: CallFrame) -> HandlerFuture<'_>;
}
