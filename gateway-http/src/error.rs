//! Invocation errors.

use gateway_http_core::{DecodeError, EncodeError};

/// Errors that fail an invocation.
///
/// Handler panics are not errors: they are recovered and answered with the
/// configured fault status.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The request envelope could not be decoded; the handler did not run.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The captured response could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The JSON payload could not be read or written.
    #[error("invalid envelope payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_is_transparent() {
        let err = InvokeError::from(DecodeError::InvalidMethod("G ET".to_string()));
        assert_eq!(err.to_string(), "invalid HTTP method: \"G ET\"");
    }

    #[test]
    fn test_payload_error() {
        let err: InvokeError = serde_json::from_slice::<serde_json::Value>(b"{")
            .unwrap_err()
            .into();
        assert!(matches!(err, InvokeError::Payload(_)));
        assert!(err.to_string().starts_with("invalid envelope payload"));
    }
}
