//! Adapter configuration - static settings shared by every invocation.

use http::StatusCode;

use crate::limits::BodyLimits;

/// Default size of each frame yielded by a request body (64 KiB).
pub const DEFAULT_FRAME_SIZE: usize = 64 * 1024;

/// Adapter-wide configuration.
///
/// Set once when the [`Adapter`](crate::Adapter) is built, read-only
/// afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Status of the envelope produced when the handler panics.
    pub fault_status: StatusCode,
    /// Body size limits.
    pub limits: BodyLimits,
    /// Infer `Content-Type` from the first body bytes when the handler
    /// writes a body without setting one.
    pub sniff_content_type: bool,
    /// Maximum size of each request body frame.
    pub frame_size: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            fault_status: StatusCode::INTERNAL_SERVER_ERROR,
            limits: BodyLimits::default(),
            sniff_content_type: false,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}
