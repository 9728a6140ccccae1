//! Invocation context.
//!
//! An [`InvocationContext`] is accepted when an invocation starts and is
//! attached, unchanged, to the decoded request. Handlers read typed values
//! from it and observe cancellation through it; the adapter itself never
//! polls it.

use std::fmt;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use http::Extensions;
use tokio::sync::Notify;

/// Cheap, cloneable handle to the context of one invocation.
///
/// Clones share values and cancellation. Adding a value to a shared
/// context produces a child that keeps the parent's cancellation signal.
///
/// # Example
///
/// ```rust
/// use gateway_http::InvocationContext;
///
/// #[derive(Clone)]
/// struct RequestId(String);
///
/// let ctx = InvocationContext::new().with_value(RequestId("abc".into()));
/// assert_eq!(ctx.value::<RequestId>().map(|id| id.0.as_str()), Some("abc"));
/// ```
#[derive(Clone, Default)]
pub struct InvocationContext {
    inner: Arc<Inner>,
}

#[derive(Clone, Default)]
struct Inner {
    values: Extensions,
    deadline: Option<Instant>,
    cancel: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl InvocationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a typed value, replacing any previous value of the same type.
    pub fn with_value<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.inner).values.insert(value);
        self
    }

    /// Attach a deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        Arc::make_mut(&mut self.inner).deadline = Some(deadline);
        self
    }

    /// Get a typed value.
    pub fn value<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.inner.values.get::<T>()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Signal cancellation to every clone of this context.
    pub fn cancel(&self) {
        let state = &self.inner.cancel;
        if !state.cancelled.swap(true, Ordering::AcqRel) {
            state.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.cancelled.load(Ordering::Acquire)
    }

    /// Wait until [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let state = &self.inner.cancel;
        loop {
            let mut notified = pin!(state.notify.notified());
            notified.as_mut().enable();
            if state.cancelled.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    /// Whether `other` is the very same context handle, not merely an equal one.
    pub fn ptr_eq(&self, other: &InvocationContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("values", &self.inner.values.len())
            .field("deadline", &self.inner.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
