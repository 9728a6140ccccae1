//! Handler boundary.
//!
//! A handler receives the decoded request and a [`ResponseCapture`], writes
//! its response into the capture and returns nothing. Any `Fn` closure of
//! that shape returning a `Send` future is a handler.

use std::future::Future;
use std::pin::Pin;

use http::Request;

use crate::body::RequestBody;
use crate::capture::ResponseCapture;

/// Future returned by [`Handler::call`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Processes one request, writing the response into `w`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request<RequestBody>, w: ResponseCapture) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request<RequestBody>, ResponseCapture) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, req: Request<RequestBody>, w: ResponseCapture) -> HandlerFuture {
        Box::pin(self(req, w))
    }
}
