//! Envelope body codecs.
//!
//! Envelope bodies are JSON strings. Binary payloads travel as standard
//! (padded) base64 with the `isBase64Encoded` flag set; text payloads travel
//! verbatim.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderStringWriter;
use bytes::Bytes;

use crate::error::{DecodeError, EncodeError};

/// How a response body is represented in the envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyEncoding {
    /// Raw text, flag false.
    Text,
    /// Standard base64, flag true.
    Base64,
}

/// A body ready to be placed in a response envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBody {
    pub body: String,
    pub is_base64_encoded: bool,
}

impl EncodedBody {
    fn empty() -> Self {
        Self {
            body: String::new(),
            is_base64_encoded: false,
        }
    }
}

/// Decode an envelope body into raw bytes.
///
/// Plain bodies are taken over without copying.
pub fn decode_body(body: String, is_base64_encoded: bool) -> Result<Bytes, DecodeError> {
    if body.is_empty() {
        return Ok(Bytes::new());
    }
    if is_base64_encoded {
        let decoded = STANDARD.decode(body.as_bytes())?;
        Ok(Bytes::from(decoded))
    } else {
        Ok(Bytes::from(body.into_bytes()))
    }
}

/// Encode body chunks totalling `len` bytes for the envelope.
///
/// An empty body is always the empty string with the flag cleared. A body
/// requested as text that is not valid UTF-8 cannot be carried verbatim in a
/// JSON string; it is base64 encoded instead.
pub fn encode_body<I>(
    chunks: I,
    len: usize,
    encoding: BodyEncoding,
) -> Result<EncodedBody, EncodeError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    if len == 0 {
        return Ok(EncodedBody::empty());
    }

    match encoding {
        BodyEncoding::Text => {
            let mut buf = Vec::with_capacity(len);
            for chunk in chunks {
                buf.extend_from_slice(chunk.as_ref());
            }
            match String::from_utf8(buf) {
                Ok(body) => Ok(EncodedBody {
                    body,
                    is_base64_encoded: false,
                }),
                Err(err) => Ok(EncodedBody {
                    body: STANDARD.encode(err.as_bytes()),
                    is_base64_encoded: true,
                }),
            }
        }
        BodyEncoding::Base64 => {
            let capacity = base64::encoded_len(len, true).unwrap_or_default();
            let mut writer =
                EncoderStringWriter::from_consumer(String::with_capacity(capacity), &STANDARD);
            for chunk in chunks {
                writer.write_all(chunk.as_ref())?;
            }
            Ok(EncodedBody {
                body: writer.into_inner(),
                is_base64_encoded: true,
            })
        }
    }
}
