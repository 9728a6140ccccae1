//! # gateway-http
//!
//! Run ordinary HTTP handlers behind an API gateway event envelope.
//!
//! A gateway delivers each HTTP request as a JSON envelope and expects a JSON
//! envelope back. This crate turns the request envelope into an
//! [`http::Request`], runs a handler that writes into a [`ResponseCapture`],
//! and turns the captured response into a response envelope.
//!
//! ## Features
//!
//! - **Plain handlers:** any `async fn(Request<RequestBody>, ResponseCapture)`.
//! - **Tower services:** [`ServiceHandler`] runs an `axum::Router` or any other
//!   `tower::Service` as a handler.
//! - **Binary bodies:** base64 request bodies are decoded once; response
//!   bodies without a textual `Content-Type` are base64 encoded.
//! - **Trailers:** headers declared in `Trailer` and set after the body are
//!   kept and folded into the response envelope.
//! - **Fault recovery:** a panicking handler, or one that faults its capture,
//!   is answered with a fixed status instead of failing the invocation.
//!
//! ## Example
//!
//! ```rust
//! use gateway_http::prelude::*;
//! use http::Request;
//!
//! async fn hello(req: Request<RequestBody>, w: ResponseCapture) {
//!     let name = req.cookies().iter().find(|c| c.name() == "name");
//!     let name = name.map(Cookie::value).unwrap_or("World");
//!     w.insert_header("Content-Type", "text/plain").unwrap();
//!     w.write_body(format!("Hello, {name}").as_bytes());
//! }
//!
//! # futures::executor::block_on(async {
//! let adapter = Adapter::new(hello);
//! let envelope = RequestEnvelope::new("/").with_header("Cookie", "name=gateway");
//! let response = adapter.handle(InvocationContext::new(), envelope).await.unwrap();
//! assert_eq!(response.body, "Hello, gateway");
//! # });
//! ```

mod body;
mod capture;
mod config;
mod content_type;
mod context;
mod error;
mod handler;
mod invoke;
mod limits;
mod request;
mod response;
mod service;

pub use body::RequestBody;
pub use capture::{ResponseCapture, ResponseState};
pub use config::{AdapterConfig, DEFAULT_FRAME_SIZE};
pub use content_type::{
    APPLICATION_OCTET_STREAM, SNIFF_LEN, TEXT_PLAIN_UTF_8, body_encoding, is_text_type,
    sniff_content_type,
};
pub use context::InvocationContext;
pub use error::InvokeError;
pub use handler::{Handler, HandlerFuture};
pub use invoke::Adapter;
pub use limits::BodyLimits;
pub use request::{Cookie, Cookies, QueryError, RequestDecoder, RequestExt, decode_request};
pub use response::{ResponseEncoder, canonical_header_name, encode_response};
pub use service::ServiceHandler;

pub use gateway_http_core::{
    BodyEncoding, DecodeError, EncodeError, HttpDescription, RequestContext, RequestEnvelope,
    ResponseEnvelope,
};

// Re-export core crates
pub use bytes;
pub use http;

pub mod prelude {
    //! The types most handlers need.
    pub use crate::body::RequestBody;
    pub use crate::capture::ResponseCapture;
    pub use crate::context::InvocationContext;
    pub use crate::error::InvokeError;
    pub use crate::invoke::Adapter;
    pub use crate::request::{Cookie, RequestExt};
    pub use crate::service::ServiceHandler;
    pub use gateway_http_core::{RequestEnvelope, ResponseEnvelope};
}
