//! Body size limits.
//!
//! The routing layer caps payload sizes itself, so both limits are off by
//! default. Set them when handlers should never see (or produce) bodies
//! above a known size.

use gateway_http_core::{DecodeError, EncodeError};

/// Configuration for request and response body sizes.
///
/// # Example
///
/// ```rust
/// use gateway_http::BodyLimits;
///
/// // No limits
/// let limits = BodyLimits::default();
///
/// // 6 MB each way
/// let limits = BodyLimits::new(6 * 1024 * 1024, 6 * 1024 * 1024);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BodyLimits {
    /// Maximum decoded request body size in bytes.
    max_request_body: Option<usize>,
    /// Maximum response body size in bytes, before base64.
    max_response_body: Option<usize>,
}

impl BodyLimits {
    /// Create limits for both directions.
    pub fn new(max_request_body: usize, max_response_body: usize) -> Self {
        Self {
            max_request_body: Some(max_request_body),
            max_response_body: Some(max_response_body),
        }
    }

    /// No limits in either direction.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Limit the decoded request body.
    pub fn max_request_body(mut self, limit: usize) -> Self {
        self.max_request_body = Some(limit);
        self
    }

    /// Limit the captured response body.
    pub fn max_response_body(mut self, limit: usize) -> Self {
        self.max_response_body = Some(limit);
        self
    }

    pub fn request_limit(&self) -> Option<usize> {
        self.max_request_body
    }

    pub fn response_limit(&self) -> Option<usize> {
        self.max_response_body
    }

    /// Check a decoded request body size.
    pub fn check_request(&self, size: usize) -> Result<(), DecodeError> {
        match self.max_request_body {
            Some(limit) if size > limit => Err(DecodeError::BodyTooLarge { size, limit }),
            _ => Ok(()),
        }
    }

    /// Check a captured response body size.
    pub fn check_response(&self, size: usize) -> Result<(), EncodeError> {
        match self.max_response_body {
            Some(limit) if size > limit => Err(EncodeError::BodyTooLarge { size, limit }),
            _ => Ok(()),
        }
    }
}
