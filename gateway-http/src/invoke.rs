//! Invocation orchestration.
//!
//! One invocation runs three phases in strict order:
//!
//! 1. decoding: envelope to request; failure is returned and the handler
//!    never runs
//! 2. executing: the handler runs once against a fresh capture; a panic or
//!    a faulted capture is answered with the configured fault status
//! 3. encoding: captured state to envelope; failure is returned

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use gateway_http_core::{RequestEnvelope, ResponseEnvelope};
use http::StatusCode;

use crate::capture::{ResponseCapture, ResponseState};
use crate::config::AdapterConfig;
use crate::context::InvocationContext;
use crate::error::InvokeError;
use crate::handler::Handler;
use crate::limits::BodyLimits;
use crate::request::RequestDecoder;
use crate::response::ResponseEncoder;

/// Runs a [`Handler`] for gateway envelopes.
///
/// The adapter holds no per-invocation state; one value can serve any
/// number of concurrent invocations.
///
/// # Example
///
/// ```rust
/// use gateway_http::{Adapter, InvocationContext, RequestEnvelope, ResponseCapture, RequestBody};
/// use http::Request;
///
/// # futures::executor::block_on(async {
/// let adapter = Adapter::new(|_req: Request<RequestBody>, w: ResponseCapture| async move {
///     w.insert_header("Content-Type", "text/plain").unwrap();
///     w.write_body(b"Hello, World");
/// });
///
/// let response = adapter
///     .handle(InvocationContext::new(), RequestEnvelope::new("/"))
///     .await
///     .unwrap();
/// assert_eq!(response.body, "Hello, World");
/// # });
/// ```
pub struct Adapter<H> {
    handler: Arc<H>,
    config: AdapterConfig,
}

impl<H> Clone for Adapter<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: self.config,
        }
    }
}

impl<H> std::fmt::Debug for Adapter<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<H: Handler> Adapter<H> {
    /// Create an adapter with the default configuration.
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            config: AdapterConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Status answered when the handler panics or faults the response.
    pub fn fault_status(mut self, status: StatusCode) -> Self {
        self.config.fault_status = status;
        self
    }

    pub fn limits(mut self, limits: BodyLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Infer a `Content-Type` for bodies written without one.
    pub fn sniff_content_type(mut self, enabled: bool) -> Self {
        self.config.sniff_content_type = enabled;
        self
    }

    /// Maximum size of each request body frame.
    pub fn frame_size(mut self, frame_size: usize) -> Self {
        self.config.frame_size = frame_size;
        self
    }

    pub fn get_config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Run one invocation for a typed envelope.
    pub async fn handle(
        &self,
        ctx: InvocationContext,
        envelope: RequestEnvelope,
    ) -> Result<ResponseEnvelope, InvokeError> {
        let request = RequestDecoder::new(&self.config).decode(envelope, ctx)?;
        let method = request.method().clone();
        let uri = request.uri().clone();

        let state =
            ResponseState::new().with_content_type_sniffing(self.config.sniff_content_type);
        let w = ResponseCapture::from_state(state);

        let handler = Arc::clone(&self.handler);
        let capture = w.clone();
        let outcome = AssertUnwindSafe(async move { handler.call(request, capture).await })
            .catch_unwind()
            .await;

        let encoder = ResponseEncoder::new(&self.config);
        let envelope = match outcome {
            Ok(()) => {
                let state = w.into_state();
                if state.is_faulted() {
                    tracing::warn!(
                        target: "gateway_http",
                        method = %method,
                        uri = %uri,
                        status = self.config.fault_status.as_u16(),
                        "handler faulted the response"
                    );
                    encoder.encode(self.fault_state())?
                } else {
                    encoder.encode(state)?
                }
            }
            Err(panic) => {
                tracing::warn!(
                    target: "gateway_http",
                    method = %method,
                    uri = %uri,
                    panic = panic_message(panic.as_ref()),
                    status = self.config.fault_status.as_u16(),
                    "handler panicked"
                );
                encoder.encode(self.fault_state())?
            }
        };

        tracing::debug!(
            target: "gateway_http",
            method = %method,
            uri = %uri,
            status = envelope.status_code,
            "invocation complete"
        );
        Ok(envelope)
    }

    fn fault_state(&self) -> ResponseState {
        let mut state = ResponseState::new();
        state.set_status(self.config.fault_status);
        state
    }

    /// Run one invocation for a JSON request envelope, returning the JSON
    /// response envelope.
    pub async fn invoke(
        &self,
        ctx: InvocationContext,
        payload: &[u8],
    ) -> Result<Vec<u8>, InvokeError> {
        let envelope: RequestEnvelope = serde_json::from_slice(payload)?;
        let response = self.handle(ctx, envelope).await?;
        Ok(serde_json::to_vec(&response)?)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
