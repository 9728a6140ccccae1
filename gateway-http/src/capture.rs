//! In-memory response sink handed to handlers.
//!
//! [`ResponseCapture`] behaves like a live response writer: set the status,
//! mutate headers, write body bytes. Nothing leaves the process until the
//! handler returns and the captured [`ResponseState`] is encoded.
//!
//! ## Header phases
//!
//! Headers mutated before the first body byte form the leading set. After
//! the first body byte:
//!
//! - names declared in the leading `Trailer` header go to the trailer set
//! - any other name is still recorded, merged into the leading set
//!
//! The status is fixed by the first body byte; later changes are ignored.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, TRAILER};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::content_type::sniff_content_type;

/// Response data captured during one invocation.
#[derive(Debug, Default)]
pub struct ResponseState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    trailers: HeaderMap,
    chunks: Vec<Bytes>,
    pending: BytesMut,
    body_len: usize,
    body_started: bool,
    sniff_content_type: bool,
    faulted: bool,
}

impl ResponseState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Infer `Content-Type` on the first body write when none is set.
    pub fn with_content_type_sniffing(mut self, enabled: bool) -> Self {
        self.sniff_content_type = enabled;
        self
    }

    /// The response status, 200 if never set.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Leading headers, including undeclared headers set after the body began.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Declared trailers set after the body began.
    pub fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    pub fn body_len(&self) -> usize {
        self.body_len
    }

    pub fn body_started(&self) -> bool {
        self.body_started
    }

    /// Whether [`fault`](Self::fault) was called.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Discard everything written so far and mark the response as failed.
    ///
    /// The state becomes a 500 with no headers and no body; the adapter
    /// answers it with its configured fault status. Later writes are ignored.
    pub fn fault(&mut self) {
        *self = ResponseState {
            status: Some(StatusCode::INTERNAL_SERVER_ERROR),
            sniff_content_type: self.sniff_content_type,
            faulted: true,
            ..ResponseState::default()
        };
    }

    /// Set the status. Ignored (returns `false`) once the body has begun.
    pub fn set_status(&mut self, status: StatusCode) -> bool {
        if self.faulted {
            return false;
        }
        if self.body_started {
            tracing::warn!(
                target: "gateway_http",
                status = status.as_u16(),
                current = self.status().as_u16(),
                "status set after body was written; ignoring"
            );
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Replace all values of `name`.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.faulted {
            return;
        }
        self.header_target(&name).insert(name, value);
    }

    /// Add a value to `name`, keeping existing ones.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.faulted {
            return;
        }
        self.header_target(&name).append(name, value);
    }

    /// Remove all values of `name` from the set it currently routes to.
    pub fn remove_header(&mut self, name: &HeaderName) {
        self.header_target(name).remove(name);
    }

    /// First value of `name`, looking at leading headers then trailers.
    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.get(name).or_else(|| self.trailers.get(name))
    }

    /// Whether `name` is listed in the leading `Trailer` header.
    pub fn is_declared_trailer(&self, name: &HeaderName) -> bool {
        self.headers
            .get_all(TRAILER)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|declared| declared.trim().eq_ignore_ascii_case(name.as_str()))
    }

    /// Append body bytes, copying them.
    pub fn write(&mut self, data: &[u8]) {
        if data.is_empty() || self.faulted {
            return;
        }
        self.start_body(data);
        self.pending.extend_from_slice(data);
        self.body_len += data.len();
    }

    /// Append body bytes without copying.
    pub fn write_bytes(&mut self, data: Bytes) {
        if data.is_empty() || self.faulted {
            return;
        }
        self.start_body(&data);
        self.flush_pending();
        self.body_len += data.len();
        self.chunks.push(data);
    }

    /// The body as written, in order.
    pub fn body_chunks(&mut self) -> &[Bytes] {
        self.flush_pending();
        &self.chunks
    }

    fn start_body(&mut self, first: &[u8]) {
        if self.body_started {
            return;
        }
        self.body_started = true;
        if self.sniff_content_type && !self.headers.contains_key(CONTENT_TYPE) {
            let sniffed = sniff_content_type(first);
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(sniffed));
        }
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            self.chunks.push(self.pending.split().freeze());
        }
    }

    fn header_target(&mut self, name: &HeaderName) -> &mut HeaderMap {
        if !self.body_started {
            return &mut self.headers;
        }
        if self.is_declared_trailer(name) {
            return &mut self.trailers;
        }
        tracing::debug!(
            target: "gateway_http",
            header = %name,
            "undeclared header set after body was written; merging into headers"
        );
        &mut self.headers
    }
}

/// Handle to the response of one invocation.
///
/// Clones share the same state, so the handle can be moved into tasks the
/// handler spawns. Header methods follow [`http::response::Builder::header`]:
/// names and values are converted with `TryFrom` and conversion errors are
/// returned.
///
/// # Example
///
/// ```rust
/// use gateway_http::ResponseCapture;
/// use http::StatusCode;
///
/// let w = ResponseCapture::new();
/// w.insert_header("Content-Type", "text/plain").unwrap();
/// w.set_status(StatusCode::CREATED);
/// w.write_body(b"created");
///
/// let state = w.into_state();
/// assert_eq!(state.status(), StatusCode::CREATED);
/// assert_eq!(state.body_len(), 7);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ResponseCapture {
    state: Arc<Mutex<ResponseState>>,
}

impl ResponseCapture {
    /// Create a capture with an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a capture over an existing state.
    pub fn from_state(state: ResponseState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the state.
    pub fn update<R>(&self, f: impl FnOnce(&mut ResponseState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Set the status. Ignored (returns `false`) once the body has begun.
    pub fn set_status(&self, status: StatusCode) -> bool {
        self.lock().set_status(status)
    }

    pub fn status(&self) -> StatusCode {
        self.lock().status()
    }

    /// Replace all values of a header.
    pub fn insert_header<K, V>(&self, name: K, value: V) -> Result<(), http::Error>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let (name, value) = convert_header(name, value)?;
        self.lock().insert_header(name, value);
        Ok(())
    }

    /// Add a header value, keeping existing ones.
    pub fn append_header<K, V>(&self, name: K, value: V) -> Result<(), http::Error>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let (name, value) = convert_header(name, value)?;
        self.lock().append_header(name, value);
        Ok(())
    }

    /// Remove all values of a header.
    pub fn remove_header<K>(&self, name: K) -> Result<(), http::Error>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
    {
        let name = HeaderName::try_from(name).map_err(Into::into)?;
        self.lock().remove_header(&name);
        Ok(())
    }

    /// First value of a header, from leading headers or trailers.
    pub fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.lock().header(name).cloned()
    }

    pub fn body_started(&self) -> bool {
        self.lock().body_started()
    }

    /// Discard the response written so far and mark it as failed.
    ///
    /// See [`ResponseState::fault`].
    pub fn fault(&self) {
        self.lock().fault();
    }

    pub fn is_faulted(&self) -> bool {
        self.lock().is_faulted()
    }

    /// Append body bytes, copying them.
    pub fn write_body(&self, data: &[u8]) {
        self.lock().write(data);
    }

    /// Append body bytes without copying.
    pub fn write_bytes(&self, data: Bytes) {
        self.lock().write_bytes(data);
    }

    /// Take the captured state.
    ///
    /// If clones of the handle are still alive (e.g. held by a task the
    /// handler spawned), the state is moved out from under them and they
    /// continue writing into an empty state that is never encoded.
    pub fn into_state(self) -> ResponseState {
        match Arc::try_unwrap(self.state) {
            Ok(state) => state.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => {
                tracing::debug!(
                    target: "gateway_http",
                    "response capture still shared after handler returned"
                );
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *state)
            }
        }
    }
}

impl io::Write for ResponseCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn convert_header<K, V>(name: K, value: V) -> Result<(HeaderName, HeaderValue), http::Error>
where
    HeaderName: TryFrom<K>,
    <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
    HeaderValue: TryFrom<V>,
    <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
{
    let name = HeaderName::try_from(name).map_err(Into::into)?;
    let value = HeaderValue::try_from(value).map_err(Into::into)?;
    Ok((name, value))
}
