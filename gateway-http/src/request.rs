//! Request decoding: envelope to [`http::Request`].
//!
//! The envelope carries one value per header name; the request uses the
//! richer [`HeaderMap`] so nothing is lost on the way in. Cookies are parsed
//! into a [`Cookies`] extension, the [`InvocationContext`] and the gateway's
//! [`RequestContext`] are attached as extensions as well.

use gateway_http_core::{DecodeError, RequestContext, RequestEnvelope, decode_body};
use http::header::{CONTENT_LENGTH, COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version};
use serde::de::DeserializeOwned;

use crate::body::RequestBody;
use crate::config::AdapterConfig;
use crate::context::InvocationContext;
use crate::limits::BodyLimits;

/// The query string does not deserialize into the requested type.
///
/// Raised by [`RequestExt::query`] while the handler runs, never while
/// decoding the envelope.
#[derive(Debug, thiserror::Error)]
#[error("invalid query string: {0}")]
pub struct QueryError(#[from] serde_qs::Error);

/// A single `name=value` pair from the `Cookie` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
}

impl Cookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Request cookies in the order they were sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cookies(Vec<Cookie>);

impl Cookies {
    /// Parse every `Cookie` header in `headers`.
    ///
    /// Segments are split on `;` and then on the first `=`. Segments without
    /// `=` or with an empty name are skipped; values are kept verbatim.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Vec::new();
        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for segment in value.split(';') {
                let Some((name, value)) = segment.trim().split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                cookies.push(Cookie::new(name, value.trim()));
            }
        }
        Cookies(cookies)
    }

    /// Value of the first cookie named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|cookie| cookie.name == name)
            .map(Cookie::value)
    }

    pub fn as_slice(&self) -> &[Cookie] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accessors for the extensions attached by [`RequestDecoder`].
pub trait RequestExt {
    /// Cookies parsed from the `Cookie` header, empty if there were none.
    fn cookies(&self) -> &[Cookie];

    /// The context the invocation was started with.
    fn invocation_context(&self) -> Option<&InvocationContext>;

    /// Request metadata supplied by the routing layer.
    fn gateway_context(&self) -> Option<&RequestContext>;

    /// Deserialize the query string.
    fn query<T: DeserializeOwned>(&self) -> Result<T, QueryError>;
}

impl<B> RequestExt for Request<B> {
    fn cookies(&self) -> &[Cookie] {
        self.extensions()
            .get::<Cookies>()
            .map(Cookies::as_slice)
            .unwrap_or(&[])
    }

    fn invocation_context(&self) -> Option<&InvocationContext> {
        self.extensions().get::<InvocationContext>()
    }

    fn gateway_context(&self) -> Option<&RequestContext> {
        self.extensions().get::<RequestContext>()
    }

    fn query<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        let query = self.uri().query().unwrap_or("");
        Ok(serde_qs::from_str(query)?)
    }
}

/// Decodes request envelopes into requests.
#[derive(Clone, Copy, Debug)]
pub struct RequestDecoder {
    limits: BodyLimits,
    frame_size: usize,
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new(&AdapterConfig::default())
    }
}

impl RequestDecoder {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            limits: config.limits,
            frame_size: config.frame_size,
        }
    }

    /// Decode `envelope`, attaching `ctx` to the resulting request.
    pub fn decode(
        &self,
        envelope: RequestEnvelope,
        ctx: InvocationContext,
    ) -> Result<Request<RequestBody>, DecodeError> {
        let method = parse_method(envelope.method())?;
        let version = parse_version(&envelope.request_context.http.protocol);
        let uri = parse_target(&envelope.raw_path, &envelope.raw_query_string)?;

        let RequestEnvelope {
            cookies: gateway_cookies,
            headers: envelope_headers,
            request_context,
            body,
            is_base64_encoded,
            ..
        } = envelope;

        let mut headers = HeaderMap::with_capacity(envelope_headers.len());
        let mut entries: Vec<_> = envelope_headers.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, value) in entries {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| DecodeError::invalid_header(&name, err))?;
            let header_value = HeaderValue::from_bytes(value.as_bytes())
                .map_err(|err| DecodeError::invalid_header(&name, err))?;
            headers.append(header_name, header_value);
        }

        if !gateway_cookies.is_empty() {
            merge_gateway_cookies(&mut headers, &gateway_cookies)?;
        }

        let body = decode_body(body, is_base64_encoded)?;
        self.limits.check_request(body.len())?;
        if body.is_empty() {
            headers.remove(CONTENT_LENGTH);
        } else {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        let cookies = Cookies::from_headers(&headers);

        tracing::debug!(
            target: "gateway_http",
            method = %method,
            uri = %uri,
            headers = headers.len(),
            cookies = cookies.len(),
            body_len = body.len(),
            "decoded request envelope"
        );

        let mut request = Request::new(RequestBody::with_frame_size(body, self.frame_size));
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = version;
        *request.headers_mut() = headers;
        let extensions = request.extensions_mut();
        extensions.insert(cookies);
        extensions.insert(request_context);
        extensions.insert(ctx);
        Ok(request)
    }
}

/// Decode `envelope` with the default configuration.
pub fn decode_request(
    envelope: RequestEnvelope,
    ctx: InvocationContext,
) -> Result<Request<RequestBody>, DecodeError> {
    RequestDecoder::default().decode(envelope, ctx)
}

fn parse_method(method: &str) -> Result<Method, DecodeError> {
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.as_bytes()).map_err(|_| DecodeError::InvalidMethod(method.to_string()))
}

fn parse_version(protocol: &str) -> Version {
    match protocol {
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/2" | "HTTP/2.0" => Version::HTTP_2,
        "HTTP/3" | "HTTP/3.0" => Version::HTTP_3,
        _ => Version::HTTP_11,
    }
}

/// Build an origin-form target from the raw path and query.
fn parse_target(raw_path: &str, raw_query: &str) -> Result<Uri, DecodeError> {
    let mut target = String::with_capacity(raw_path.len() + raw_query.len() + 2);
    if !raw_path.starts_with('/') {
        target.push('/');
    }
    target.push_str(raw_path);
    if !raw_query.is_empty() {
        target.push('?');
        target.push_str(raw_query);
    }

    let uri: Uri = target
        .parse()
        .map_err(|err: http::uri::InvalidUri| DecodeError::MalformedTarget {
            target: target.clone(),
            reason: err.to_string(),
        })?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return Err(DecodeError::MalformedTarget {
            target,
            reason: "expected a path, found an absolute target".to_string(),
        });
    }
    Ok(uri)
}

/// Fold the envelope's separate cookie list into the `Cookie` header.
fn merge_gateway_cookies(headers: &mut HeaderMap, cookies: &[String]) -> Result<(), DecodeError> {
    let mut merged = match headers.get(COOKIE).map(HeaderValue::to_str) {
        Some(Ok(existing)) if !existing.trim().is_empty() => format!("{existing}; "),
        _ => String::new(),
    };
    merged.push_str(&cookies.join("; "));

    let value = HeaderValue::from_str(&merged)
        .map_err(|err| DecodeError::invalid_header(COOKIE.as_str(), err))?;
    headers.insert(COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body::Body;
    use http_body_util::BodyExt;
    use std::collections::HashMap;

    async fn body_bytes(req: Request<RequestBody>) -> Bytes {
        req.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_basic_get() {
        let req = decode_request(RequestEnvelope::new("/path"), InvocationContext::new()).unwrap();

        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.uri(), "/path");
        assert!(req.headers().is_empty());
        assert!(req.headers().get(CONTENT_LENGTH).is_none());
        assert!(req.body().is_end_stream());
        assert!(body_bytes(req).await.is_empty());
    }

    #[test]
    fn test_basic_post() {
        let envelope = RequestEnvelope::new("/path").with_method("POST");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.uri().path(), "/path");
    }

    #[test]
    fn test_headers() {
        let envelope = RequestEnvelope::new("/path")
            .with_header("Accept", "*")
            .with_header("User-Agent", "Chrome, or something");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(req.headers().len(), 2);
        assert_eq!(req.headers()["accept"], "*");
        assert_eq!(req.headers()["user-agent"], "Chrome, or something");
    }

    #[test]
    fn test_query_string() {
        let envelope = RequestEnvelope::new("/path").with_query("a=123&b=456");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(req.uri(), "/path?a=123&b=456");
        assert_eq!(req.uri().query(), Some("a=123&b=456"));

        let params: HashMap<String, String> = req.query().unwrap();
        assert_eq!(params["a"], "123");
        assert_eq!(params["b"], "456");
    }

    #[test]
    fn test_query_type_mismatch() {
        let envelope = RequestEnvelope::new("/path").with_query("n=abc");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        let err = req.query::<HashMap<String, u32>>().unwrap_err();
        assert!(err.to_string().starts_with("invalid query string"));
    }

    #[test]
    fn test_empty_query_adds_no_question_mark() {
        let req = decode_request(RequestEnvelope::new("/path"), InvocationContext::new()).unwrap();
        assert_eq!(req.uri().query(), None);
    }

    #[tokio::test]
    async fn test_json_post() {
        let envelope = RequestEnvelope::new("/path")
            .with_method("POST")
            .with_header("Content-Type", "application/json")
            .with_body("{}");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(req.headers()[CONTENT_LENGTH], "2");
        assert_eq!(req.headers()["content-type"], "application/json");
        assert_eq!(req.body().size_hint().exact(), Some(2));
        assert_eq!(body_bytes(req).await, "{}");
    }

    #[tokio::test]
    async fn test_base64_body() {
        let envelope = RequestEnvelope::new("/path")
            .with_method("POST")
            .with_base64_body("MTIzNDU=");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(req.headers()[CONTENT_LENGTH], "5");
        assert_eq!(body_bytes(req).await, "12345");
    }

    #[test]
    fn test_content_length_reflects_decoded_body() {
        let envelope = RequestEnvelope::new("/path")
            .with_header("Content-Length", "999")
            .with_base64_body("MTIzNDU=");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(req.headers().get_all(CONTENT_LENGTH).iter().count(), 1);
        assert_eq!(req.headers()[CONTENT_LENGTH], "5");
    }

    #[test]
    fn test_empty_body_drops_content_length() {
        let envelope = RequestEnvelope::new("/path").with_header("Content-Length", "0");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert!(req.headers().get(CONTENT_LENGTH).is_none());
        assert!(req.body().is_end_stream());
    }

    #[test]
    fn test_cookies() {
        let envelope = RequestEnvelope::new("/path")
            .with_header("Cookie", "name=value; name2=value2; name3=value3");
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(
            req.cookies(),
            &[
                Cookie::new("name", "value"),
                Cookie::new("name2", "value2"),
                Cookie::new("name3", "value3"),
            ]
        );
    }

    #[test]
    fn test_malformed_cookie_segments_are_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("a=1; broken; =nameless; b=x=y;"));
        let cookies = Cookies::from_headers(&headers);

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("a"), Some("1"));
        assert_eq!(cookies.get("b"), Some("x=y"));
    }

    #[test]
    fn test_gateway_cookie_list_is_merged() {
        let mut envelope = RequestEnvelope::new("/path").with_header("cookie", "first=1");
        envelope.cookies = vec!["second=2".to_string(), "third=3".to_string()];
        let req = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(req.headers()[COOKIE], "first=1; second=2; third=3");
        let names: Vec<_> = req.cookies().iter().map(Cookie::name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_no_cookie_header_yields_no_cookies() {
        let req = decode_request(RequestEnvelope::new("/path"), InvocationContext::new()).unwrap();
        assert!(req.cookies().is_empty());
    }

    #[test]
    fn test_invalid_base64_body() {
        let envelope = RequestEnvelope::new("/path").with_base64_body("not base64!");
        let err = decode_request(envelope, InvocationContext::new()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidBase64(_)));
    }

    #[test]
    fn test_malformed_target() {
        let envelope = RequestEnvelope::new("/pa th");
        let err = decode_request(envelope, InvocationContext::new()).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedTarget { .. }));
    }

    #[test]
    fn test_invalid_method() {
        let envelope = RequestEnvelope::new("/path").with_method("GE T");
        let err = decode_request(envelope, InvocationContext::new()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidMethod(m) if m == "GE T"));
    }

    #[test]
    fn test_invalid_header_name() {
        let envelope = RequestEnvelope::new("/path").with_header("Bad Header", "x");
        let err = decode_request(envelope, InvocationContext::new()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidHeader { name, .. } if name == "Bad Header"));
    }

    #[test]
    fn test_empty_path_is_root() {
        let req = decode_request(RequestEnvelope::new(""), InvocationContext::new()).unwrap();
        assert_eq!(req.uri(), "/");
    }

    #[test]
    fn test_body_limit() {
        let config = AdapterConfig {
            limits: BodyLimits::unlimited().max_request_body(4),
            ..Default::default()
        };
        let envelope = RequestEnvelope::new("/path").with_body("12345");
        let err = RequestDecoder::new(&config)
            .decode(envelope, InvocationContext::new())
            .unwrap_err();
        assert!(matches!(err, DecodeError::BodyTooLarge { size: 5, limit: 4 }));
    }

    #[test]
    fn test_context_is_attached() {
        #[derive(Clone)]
        struct Key(&'static str);

        let ctx = InvocationContext::new().with_value(Key("abc"));
        let mut envelope = RequestEnvelope::new("/path");
        envelope.request_context.request_id = "req-1".to_string();
        envelope.request_context.http.protocol = "HTTP/2.0".to_string();
        let req = decode_request(envelope, ctx.clone()).unwrap();

        let attached = req.invocation_context().unwrap();
        assert!(attached.ptr_eq(&ctx));
        assert_eq!(attached.value::<Key>().map(|k| k.0), Some("abc"));
        assert_eq!(req.gateway_context().unwrap().request_id, "req-1");
        assert_eq!(req.version(), Version::HTTP_2);
    }

    #[tokio::test]
    async fn test_decode_is_idempotent() {
        let envelope = RequestEnvelope::new("/path")
            .with_method("PUT")
            .with_query("x=1")
            .with_header("Cookie", "a=1; b=2")
            .with_header("X-One", "1")
            .with_base64_body("aGVsbG8=");

        let first = decode_request(envelope.clone(), InvocationContext::new()).unwrap();
        let second = decode_request(envelope, InvocationContext::new()).unwrap();

        assert_eq!(first.method(), second.method());
        assert_eq!(first.uri(), second.uri());
        assert_eq!(first.headers(), second.headers());
        assert_eq!(first.cookies(), second.cookies());
        assert_eq!(body_bytes(first).await, body_bytes(second).await);
    }
}
