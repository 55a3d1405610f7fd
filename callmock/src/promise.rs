// vim: tw=80
//! Suspension support: the promise a pending call awaits, the handle a test
//! uses to release it, and the latch `verify` waits on.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{Arc, Condvar, Mutex},
    task::{Context, Poll},
    time::Duration,
};

use futures::{FutureExt, channel::oneshot};

use crate::{lock, outcome::Payload};

/// How a promise was resolved.
pub(crate) type Resolution = Result<Payload, Payload>;

/// Create a pending promise, and the handle that resolves it with `staged`.
pub(crate) fn channel(staged: Resolution) -> (FulfillHandle, Promise) {
    let (sender, receiver) = oneshot::channel();
    let handle = FulfillHandle(Arc::new(Mutex::new(Some(Staged {
        sender,
        resolution: staged
    }))));
    (handle, Promise(receiver))
}

/// A value that a suspended call awaits.
///
/// It starts out pending and is resolved at most once, by
/// [`FulfillHandle::fulfill`].  Awaiting it yields `Ok` with the value of a
/// [`PendingSuccess`](crate::Outcome::PendingSuccess) or `Err` with the error
/// of a [`PendingFailure`](crate::Outcome::PendingFailure).  If every handle
/// is dropped unfulfilled, it never resolves.
pub struct Promise(oneshot::Receiver<Resolution>);

impl Future for Promise {
    type Output = Resolution;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>)
        -> Poll<Resolution>
    {
        match self.0.poll_unpin(cx) {
            Poll::Ready(Ok(resolution)) => Poll::Ready(resolution),
            Poll::Ready(Err(oneshot::Canceled)) | Poll::Pending => Poll::Pending
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Promise").finish()
    }
}

struct Staged {
    sender: oneshot::Sender<Resolution>,
    resolution: Resolution,
}

/// Releases a suspended call at a moment of the test's choosing.
///
/// Returned by
/// [`async_returning`](crate::ExpectationBuilder::async_returning) and
/// [`async_throwing`](crate::ExpectationBuilder::async_throwing).  The value
/// or error is fixed when the expectation is declared; `fulfill` only decides
/// when the caller gets it.
#[derive(Clone)]
pub struct FulfillHandle(Arc<Mutex<Option<Staged>>>);

impl FulfillHandle {
    /// Resolve the promise, waking any caller suspended on it.
    ///
    /// Calling this more than once has no further effect.
    pub fn fulfill(&self) {
        let staged = lock(&self.0).take();
        if let Some(Staged{sender, resolution}) = staged {
            tracing::debug!("fulfilling pending expectation");
            // Nobody is listening if the expectation was already dropped
            let _ = sender.send(resolution);
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        lock(&self.0).is_none()
    }
}

impl fmt::Debug for FulfillHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FulfillHandle")
            .field("fulfilled", &self.is_fulfilled())
            .finish()
    }
}

/// A one-shot flag that other threads can wait on, with a timeout.
#[derive(Clone, Default)]
pub(crate) struct Latch(Arc<(Mutex<bool>, Condvar)>);

impl Latch {
    pub(crate) fn release(&self) {
        *lock(&self.0.0) = true;
        self.0.1.notify_all();
    }

    /// Returns whether the latch was released before `timeout` elapsed.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = lock(&self.0.0);
        let (guard, _) = self.0.1.wait_timeout_while(guard, timeout, |r| !*r)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard
    }
}
