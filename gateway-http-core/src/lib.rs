//! Core envelope types for gateway-http.
//!
//! This crate provides the wire types and body codecs shared by the request
//! decoder and response encoder in `gateway-http`.
//!
//! ## Modules
//!
//! - [`envelope`]: Gateway request/response envelope types
//! - [`codec`]: Envelope body encoding (raw text or standard base64)
//! - [`error`]: Decode and encode error types

mod codec;
mod envelope;
mod error;

pub use codec::*;
pub use envelope::*;
pub use error::*;
