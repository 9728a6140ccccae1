//! Decode and encode error types.
//!
//! - [`DecodeError`]: the inbound envelope cannot be turned into a request
//! - [`EncodeError`]: the captured response cannot be turned into an envelope
//!
//! Both are terminal for the invocation that produced them.

/// Errors raised while decoding a request envelope.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The method is not a valid HTTP token.
    #[error("invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    /// Path and query do not form a valid request target.
    #[error("malformed request target {target:?}: {reason}")]
    MalformedTarget { target: String, reason: String },

    /// A header name or value is not valid HTTP.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The body is flagged as base64 but does not decode.
    #[error("invalid base64 request body: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The decoded body exceeds the configured limit.
    #[error("request body of {size} bytes exceeds maximum allowed size of {limit} bytes")]
    BodyTooLarge { size: usize, limit: usize },
}

impl DecodeError {
    pub fn invalid_header<N: Into<String>, R: ToString>(name: N, reason: R) -> Self {
        DecodeError::InvalidHeader {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while encoding a response envelope.
///
/// These indicate a response that cannot be represented in the envelope,
/// never bad input from the routing layer.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A header value is not valid UTF-8 and cannot be carried as a JSON string.
    #[error("header {name:?} has a value that is not valid UTF-8")]
    InvalidHeaderValue { name: String },

    /// The response body exceeds the configured limit.
    #[error("response body of {size} bytes exceeds maximum allowed size of {limit} bytes")]
    BodyTooLarge { size: usize, limit: usize },

    /// Writing the encoded body failed.
    #[error("body encoding failed: {0}")]
    Body(#[from] std::io::Error),
}
