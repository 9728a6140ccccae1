//! Request body type handed to handlers.
//!
//! [`RequestBody`] exposes the decoded envelope body as an
//! [`http_body::Body`]. The bytes are decoded once; frames are zero-copy
//! slices of that buffer, so a handler that reads part of the body or drops
//! it never causes another copy.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

use crate::config::DEFAULT_FRAME_SIZE;

/// A request body decoded from an envelope.
pub enum RequestBody {
    /// No body.
    Empty,
    /// A fully decoded body, yielded in frames of at most `frame_size` bytes.
    Full { data: Bytes, frame_size: usize },
}

impl RequestBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        RequestBody::Empty
    }

    /// Create a body over `data` with the default frame size.
    pub fn full(data: Bytes) -> Self {
        Self::with_frame_size(data, DEFAULT_FRAME_SIZE)
    }

    /// Create a body over `data` yielding frames of at most `frame_size` bytes.
    ///
    /// Empty data produces [`RequestBody::Empty`].
    pub fn with_frame_size(data: Bytes, frame_size: usize) -> Self {
        if data.is_empty() {
            RequestBody::Empty
        } else {
            RequestBody::Full {
                data,
                frame_size: frame_size.max(1),
            }
        }
    }

    /// Bytes not yet yielded.
    pub fn remaining(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Full { data, .. } => data.len(),
        }
    }
}

impl Body for RequestBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let chunk = match this {
            RequestBody::Empty => return Poll::Ready(None),
            RequestBody::Full { data, frame_size } => {
                if data.len() > *frame_size {
                    data.split_to(*frame_size)
                } else {
                    std::mem::take(data)
                }
            }
        };
        if this.remaining() == 0 {
            *this = RequestBody::Empty;
        }
        Poll::Ready(Some(Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining() as u64)
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        RequestBody::Empty
    }
}

impl From<Bytes> for RequestBody {
    fn from(data: Bytes) -> Self {
        RequestBody::full(data)
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "RequestBody::Empty"),
            RequestBody::Full { data, frame_size } => f
                .debug_struct("RequestBody::Full")
                .field("data_len", &data.len())
                .field("frame_size", frame_size)
                .finish(),
        }
    }
}
