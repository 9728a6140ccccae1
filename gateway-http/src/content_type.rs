//! Content-Type classification for response bodies.
//!
//! Bodies with a textual media type travel verbatim in the envelope; all
//! others, including bodies with no `Content-Type`, are base64 encoded.

use gateway_http_core::BodyEncoding;

/// Media types treated as text in addition to `text/*` and `*+xml`.
const TEXT_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "text/xml",
    "application/xhtml+xml",
    "image/svg+xml",
];

/// Number of leading body bytes inspected when sniffing.
pub const SNIFF_LEN: usize = 512;

pub const TEXT_PLAIN_UTF_8: &str = "text/plain; charset=utf-8";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// Whether a `Content-Type` value denotes a textual body.
///
/// Parameters are ignored and matching is case-insensitive.
///
/// ```rust
/// use gateway_http::is_text_type;
///
/// assert!(is_text_type("text/html; charset=utf-8"));
/// assert!(is_text_type("application/atom+xml"));
/// assert!(!is_text_type("image/jpeg"));
/// ```
pub fn is_text_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/")
        || essence.ends_with("+xml")
        || TEXT_TYPES.contains(&essence.as_str())
}

/// Pick the envelope body encoding for an optional `Content-Type`.
pub fn body_encoding(content_type: Option<&str>) -> BodyEncoding {
    match content_type {
        Some(content_type) if is_text_type(content_type) => BodyEncoding::Text,
        _ => BodyEncoding::Base64,
    }
}

/// Infer a `Content-Type` from the first bytes of a body.
///
/// UTF-8 without binary control bytes is plain text, anything else is an
/// octet stream. A multi-byte character cut off at the sniff boundary is
/// not treated as invalid.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(SNIFF_LEN)];
    if head.iter().copied().any(is_binary_byte) {
        return APPLICATION_OCTET_STREAM;
    }
    match std::str::from_utf8(head) {
        Ok(_) => TEXT_PLAIN_UTF_8,
        Err(err) if err.error_len().is_none() && data.len() > head.len() => TEXT_PLAIN_UTF_8,
        Err(_) => APPLICATION_OCTET_STREAM,
    }
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_text_type() {
        for input in [
            "text/html",
            "text/plain; charset=utf-8",
            "image/svg+xml",
            "application/xhtml+xml",
            "application/xml",
            "text/xml",
            "application/json",
            "application/json; charset=utf-8",
            "APPLICATION/JSON",
            "application/rss+xml",
        ] {
            assert!(is_text_type(input), "{input} should be text");
        }
    }

    #[test]
    fn test_is_not_text_type() {
        for input in [
            "image/jpeg",
            "application/octet-stream",
            "application/pdf",
            "application/x-www-form-urlencoded",
            "",
        ] {
            assert!(!is_text_type(input), "{input} should be binary");
        }
    }

    #[test]
    fn test_suffix_checked_without_parameters() {
        assert!(is_text_type("application/soap+xml; charset=utf-8"));
        assert!(!is_text_type("application/octet-stream; name=a+xml"));
    }

    #[test]
    fn test_body_encoding() {
        assert_eq!(body_encoding(Some("text/plain")), BodyEncoding::Text);
        assert_eq!(body_encoding(Some("image/png")), BodyEncoding::Base64);
        assert_eq!(body_encoding(None), BodyEncoding::Base64);
    }

    #[test]
    fn test_sniff_text() {
        assert_eq!(sniff_content_type(b"Hello, World"), TEXT_PLAIN_UTF_8);
        assert_eq!(sniff_content_type("héllo\r\n\t".as_bytes()), TEXT_PLAIN_UTF_8);
    }

    #[test]
    fn test_sniff_binary() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(sniff_content_type(&png), APPLICATION_OCTET_STREAM);
        assert_eq!(sniff_content_type(&[0xff, 0xfe, 0xfd]), APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn test_sniff_truncated_character_at_boundary() {
        let mut data = vec![b'a'; SNIFF_LEN - 1];
        data.extend_from_slice("é".as_bytes());
        assert_eq!(sniff_content_type(&data), TEXT_PLAIN_UTF_8);
    }
}
