//! Gateway HTTP event envelopes.
//!
//! The routing layer delivers each request as a JSON document (payload
//! format 2.0) and expects a JSON document back:
//!
//! ```text
//! {"rawPath": "/path", "rawQueryString": "a=1", "headers": {...},
//!  "requestContext": {"http": {"method": "POST"}}, "body": "...", "isBase64Encoded": false}
//! ```
//!
//! Request fields are all optional on the wire and default when absent.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};

/// Inbound event envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestEnvelope {
    /// Payload format version (e.g. "2.0").
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub route_key: String,
    /// Path without the query string.
    #[serde(deserialize_with = "null_as_default")]
    pub raw_path: String,
    /// Query string without the leading `?`.
    #[serde(deserialize_with = "null_as_default")]
    pub raw_query_string: String,
    /// Cookies delivered separately from the `Cookie` header.
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub cookies: Vec<String>,
    /// One value per header name.
    #[serde(deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_as_default")]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_as_default")]
    pub path_parameters: HashMap<String, String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_as_default")]
    pub stage_variables: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub request_context: RequestContext,
    /// Request body, base64 encoded when `is_base64_encoded` is set.
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

impl RequestEnvelope {
    /// Create an envelope for `raw_path` with everything else defaulted.
    pub fn new<S: Into<String>>(raw_path: S) -> Self {
        Self {
            raw_path: raw_path.into(),
            ..Default::default()
        }
    }

    /// The HTTP method as delivered, possibly empty.
    pub fn method(&self) -> &str {
        &self.request_context.http.method
    }

    /// Set the HTTP method.
    pub fn with_method<S: Into<String>>(mut self, method: S) -> Self {
        self.request_context.http.method = method.into();
        self
    }

    /// Set the raw query string.
    pub fn with_query<S: Into<String>>(mut self, raw_query_string: S) -> Self {
        self.raw_query_string = raw_query_string.into();
        self
    }

    /// Add a header, replacing any previous value for the same key.
    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a plain text body.
    pub fn with_body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = body.into();
        self.is_base64_encoded = false;
        self
    }

    /// Set a body that is already base64 encoded.
    pub fn with_base64_body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = body.into();
        self.is_base64_encoded = true;
        self
    }
}

/// Request metadata supplied by the routing layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestContext {
    #[serde(deserialize_with = "null_as_default")]
    pub account_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub api_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub domain_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub domain_prefix: String,
    #[serde(deserialize_with = "null_as_default")]
    pub request_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub route_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stage: String,
    #[serde(deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub time_epoch: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub http: HttpDescription,
}

/// HTTP-level description of the inbound request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpDescription {
    /// HTTP method; empty means `GET`.
    #[serde(deserialize_with = "null_as_default")]
    pub method: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub protocol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source_ip: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_agent: String,
}

/// Outbound event envelope.
///
/// `multi_value_headers` is ordered by header name so that serialized
/// output is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,
    /// `Set-Cookie` values, mirrored from `multi_value_headers`.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub cookies: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

/// Deserialize `null` as the type's default, as the routing layer sends
/// `null` for absent strings, maps and objects.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_request_envelope() {
        let json = r#"{
            "version": "2.0",
            "routeKey": "$default",
            "rawPath": "/my/path",
            "rawQueryString": "parameter1=value1&parameter2=value2",
            "cookies": ["cookie1", "cookie2"],
            "headers": {"header1": "value1", "header2": "value1,value2"},
            "requestContext": {
                "accountId": "123456789012",
                "apiId": "api-id",
                "requestId": "id",
                "http": {
                    "method": "POST",
                    "path": "/my/path",
                    "protocol": "HTTP/1.1",
                    "sourceIp": "192.0.2.1",
                    "userAgent": "agent"
                },
                "timeEpoch": 1583348638390
            },
            "body": "Hello from Lambda",
            "isBase64Encoded": false
        }"#;

        let envelope: RequestEnvelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.raw_path, "/my/path");
        assert_eq!(envelope.raw_query_string, "parameter1=value1&parameter2=value2");
        assert_eq!(envelope.cookies, vec!["cookie1", "cookie2"]);
        assert_eq!(envelope.headers["header2"], "value1,value2");
        assert_eq!(envelope.method(), "POST");
        assert_eq!(envelope.request_context.request_id, "id");
        assert_eq!(envelope.request_context.time_epoch, 1583348638390);
        assert_eq!(envelope.body, "Hello from Lambda");
        assert!(!envelope.is_base64_encoded);
    }

    #[test]
    fn test_deserialize_minimal_request_envelope() {
        let envelope: RequestEnvelope = serde_json::from_str(r#"{"rawPath":"/path"}"#).unwrap();

        assert_eq!(envelope, RequestEnvelope::new("/path"));
        assert_eq!(envelope.method(), "");
        assert!(envelope.headers.is_empty());
    }

    #[test]
    fn test_deserialize_null_fields() {
        let json = r#"{
            "rawPath": "/path",
            "rawQueryString": null,
            "cookies": null,
            "headers": null,
            "queryStringParameters": null,
            "requestContext": {"requestId": null, "timeEpoch": null, "http": null},
            "body": null,
            "isBase64Encoded": null
        }"#;

        let envelope: RequestEnvelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope, RequestEnvelope::new("/path"));
    }

    #[test]
    fn test_deserialize_response_with_null_fields() {
        let json = r#"{"statusCode":204,"multiValueHeaders":null,"cookies":null,"body":null}"#;

        let envelope: ResponseEnvelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.status_code, 204);
        assert!(envelope.multi_value_headers.is_empty());
        assert_eq!(envelope.body, "");
    }

    #[test]
    fn test_builder_helpers() {
        let envelope = RequestEnvelope::new("/path")
            .with_method("PUT")
            .with_query("a=1")
            .with_header("Accept", "*")
            .with_base64_body("MTIzNDU=");

        assert_eq!(envelope.method(), "PUT");
        assert_eq!(envelope.raw_query_string, "a=1");
        assert_eq!(envelope.headers["Accept"], "*");
        assert!(envelope.is_base64_encoded);
    }

    #[test]
    fn test_serialize_response_envelope() {
        let mut envelope = ResponseEnvelope {
            status_code: 200,
            body: "Hello".to_string(),
            ..Default::default()
        };
        envelope
            .multi_value_headers
            .insert("X-B".to_string(), vec!["2".to_string()]);
        envelope
            .multi_value_headers
            .insert("X-A".to_string(), vec!["1".to_string(), "3".to_string()]);

        let json = serde_json::to_string(&envelope).unwrap();

        assert_eq!(
            json,
            r#"{"statusCode":200,"multiValueHeaders":{"X-A":["1","3"],"X-B":["2"]},"body":"Hello","isBase64Encoded":false}"#
        );
    }

    #[test]
    fn test_serialize_response_envelope_with_cookies() {
        let envelope = ResponseEnvelope {
            status_code: 404,
            cookies: vec!["a=b".to_string()],
            ..Default::default()
        };

        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["statusCode"], 404);
        assert_eq!(value["cookies"][0], "a=b");
        assert_eq!(value["multiValueHeaders"], serde_json::json!({}));
    }
}
