//! Tower services as handlers.
//!
//! [`ServiceHandler`] runs a `tower::Service` (an `axum::Router`, for
//! example) and replays the response it produces into the capture: status
//! and headers first, then data frames as body writes, then trailer frames
//! as header writes after the body.
//!
//! A failing service call or body stream faults the capture, so a cut-off
//! body is never reported as a success.

use std::fmt;
use std::pin::pin;

use bytes::Buf;
use http::{HeaderMap, Request, Response};
use http_body::Body;
use http_body_util::BodyExt;
use tower::{Service, ServiceExt};

use crate::body::RequestBody;
use crate::capture::{ResponseCapture, ResponseState};
use crate::handler::{Handler, HandlerFuture};

/// Adapts a [`tower::Service`] into a [`Handler`].
///
/// ```rust,ignore
/// let router = axum::Router::new().route("/", axum::routing::get(|| async { "hi" }));
/// let adapter = Adapter::new(ServiceHandler::new(router));
/// ```
#[derive(Clone, Debug)]
pub struct ServiceHandler<S> {
    service: S,
}

impl<S> ServiceHandler<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn into_inner(self) -> S {
        self.service
    }
}

impl<S, B> Handler for ServiceHandler<S>
where
    S: Service<Request<RequestBody>, Response = Response<B>> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: fmt::Display,
{
    fn call(&self, req: Request<RequestBody>, w: ResponseCapture) -> HandlerFuture {
        let service = self.service.clone();
        Box::pin(async move {
            match service.oneshot(req).await {
                Ok(response) => replay(response, &w).await,
                Err(err) => {
                    tracing::warn!(target: "gateway_http", error = %err, "service call failed");
                    w.fault();
                }
            }
        })
    }
}

async fn replay<B>(response: Response<B>, w: &ResponseCapture)
where
    B: Body,
    B::Error: fmt::Display,
{
    let (parts, body) = response.into_parts();
    w.update(|state| {
        state.set_status(parts.status);
        append_all(state, &parts.headers);
    });

    let mut body = pin!(body);
    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(target: "gateway_http", error = %err, "service body failed");
                w.fault();
                return;
            }
        };
        match frame.into_data() {
            Ok(mut data) => w.write_bytes(data.copy_to_bytes(data.remaining())),
            Err(frame) => {
                if let Ok(trailers) = frame.into_trailers() {
                    w.update(|state| append_all(state, &trailers));
                }
            }
        }
    }
}

fn append_all(state: &mut ResponseState, headers: &HeaderMap) {
    for (name, value) in headers {
        state.append_header(name.clone(), value.clone());
    }
}
