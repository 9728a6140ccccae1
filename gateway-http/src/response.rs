//! Response encoding.
//!
//! Turns a completed [`ResponseState`] into a [`ResponseEnvelope`]:
//!
//! - status copied, 200 if never set
//! - `Content-Length` recomputed from the body
//! - leading headers and trailers flattened into one multi-value map keyed
//!   by canonical header name
//! - `Set-Cookie` values mirrored into the cookie list
//! - body carried as text or base64 depending on `Content-Type`

use std::collections::BTreeMap;

use gateway_http_core::{EncodeError, EncodedBody, ResponseEnvelope, encode_body};
use http::HeaderName;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};

use crate::capture::ResponseState;
use crate::config::AdapterConfig;
use crate::content_type::body_encoding;
use crate::limits::BodyLimits;

/// Encodes captured responses into envelopes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseEncoder {
    limits: BodyLimits,
}

impl ResponseEncoder {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            limits: config.limits,
        }
    }

    /// Encode `state`.
    pub fn encode(&self, mut state: ResponseState) -> Result<ResponseEnvelope, EncodeError> {
        let body_len = state.body_len();
        self.limits.check_response(body_len)?;

        let explicit_length = state.header(&CONTENT_LENGTH).is_some();
        let mut multi_value_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in state.headers().iter().chain(state.trailers().iter()) {
            if name == CONTENT_LENGTH {
                continue;
            }
            let value = std::str::from_utf8(value.as_bytes()).map_err(|_| {
                EncodeError::InvalidHeaderValue {
                    name: name.as_str().to_string(),
                }
            })?;
            multi_value_headers
                .entry(canonical_header_name(name))
                .or_default()
                .push(value.to_string());
        }
        if body_len > 0 || explicit_length {
            multi_value_headers.insert(
                canonical_header_name(&CONTENT_LENGTH),
                vec![body_len.to_string()],
            );
        }

        let cookies = multi_value_headers
            .get("Set-Cookie")
            .cloned()
            .unwrap_or_default();

        let content_type = multi_value_headers
            .get(&canonical_header_name(&CONTENT_TYPE))
            .and_then(|values| values.first())
            .map(String::as_str);
        let encoding = body_encoding(content_type);

        let EncodedBody {
            body,
            is_base64_encoded,
        } = encode_body(state.body_chunks(), body_len, encoding)?;

        tracing::debug!(
            target: "gateway_http",
            status = state.status().as_u16(),
            headers = multi_value_headers.len(),
            trailers = state.trailers().len(),
            body_len,
            is_base64_encoded,
            "encoded response envelope"
        );

        Ok(ResponseEnvelope {
            status_code: state.status().as_u16(),
            multi_value_headers,
            cookies,
            body,
            is_base64_encoded,
        })
    }
}

/// Encode `state` with the default configuration.
pub fn encode_response(state: ResponseState) -> Result<ResponseEnvelope, EncodeError> {
    ResponseEncoder::default().encode(state)
}

/// Canonical MIME casing: the first letter and every letter after a hyphen
/// upper case, the rest lower case.
pub fn canonical_header_name(name: &HeaderName) -> String {
    let mut upper = true;
    name.as_str()
        .chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}
