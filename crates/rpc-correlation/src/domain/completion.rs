//! Single-assignment completion handle.
//!
//! A call is settled exactly once. Three parties race to settle it: the
//! receive path (response), the timeout sweeper and the call's owner
//! (cancellation). The race is decided by one compare-and-set on an atomic
//! flag; only the winner touches the one-shot channel, so the awaiter is
//! resumed exactly once.
//!
//! ```text
//!   CompletionHandle (settle side, cloneable)      Completion (await side)
//!   ┌──────────────────────────────┐               ┌────────────────────┐
//!   │ settled: AtomicBool (CAS)    │──oneshot────▶ │ Receiver<T>        │
//!   │ sender:  Option<Sender<T>>   │               └────────────────────┘
//!   │ on_cancel: Option<FnOnce()>  │
//!   └──────────────────────────────┘
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;

type CancelCallback = Box<dyn FnOnce() + Send + 'static>;

struct Inner<T> {
    settled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<T>>>,
    on_cancel: Mutex<Option<CancelCallback>>,
}

/// Settle side of a pending call.
///
/// Cheap to clone; all clones refer to the same single-assignment slot.
pub struct CompletionHandle<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T> CompletionHandle<T> {
    /// Create a pending handle and the future that observes it.
    #[must_use]
    pub fn new() -> (Self, Completion<T>) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            inner: Arc::new(Inner {
                settled: AtomicBool::new(false),
                sender: Mutex::new(Some(tx)),
                on_cancel: Mutex::new(None),
            }),
        };
        (handle, Completion { receiver: Some(rx) })
    }

    /// Settle with `value` if still pending.
    ///
    /// Returns `true` only for the call that performed the transition. A
    /// registered cancellation callback is discarded without running.
    pub fn try_settle(&self, value: T) -> bool {
        if !self.claim() {
            return false;
        }
        let discarded = self.inner.on_cancel.lock().take();
        drop(discarded);
        self.deliver(value);
        true
    }

    /// Cancel: settle with `value`, running the cancellation callback first.
    ///
    /// No-op returning `false` if the handle is already settled.
    pub fn cancel(&self, value: T) -> bool {
        if !self.claim() {
            return false;
        }
        let callback = self.inner.on_cancel.lock().take();
        if let Some(callback) = callback {
            callback();
        }
        self.deliver(value);
        true
    }

    /// Store a callback to run if the call is cancelled while pending.
    ///
    /// Ignored once settled. A later registration replaces an earlier one.
    pub fn register_cancellation<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.inner.on_cancel.lock();
        if self.is_settled() {
            return;
        }
        *slot = Some(Box::new(callback));
    }

    pub fn is_settled(&self) -> bool {
        self.inner.settled.load(Ordering::Acquire)
    }

    /// Non-owning reference that does not keep the call alive.
    pub fn downgrade(&self) -> WeakCompletionHandle<T> {
        WeakCompletionHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn claim(&self) -> bool {
        self.inner
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn deliver(&self, value: T) {
        if let Some(sender) = self.inner.sender.lock().take() {
            // Awaiter may have gone away; the transition still counts.
            let _ = sender.send(value);
        }
    }
}

/// Weak counterpart of [`CompletionHandle`].
///
/// Held by the awaiting side so that dropping every strong handle without
/// settling still wakes the awaiter with [`Abandoned`].
pub struct WeakCompletionHandle<T> {
    inner: Weak<Inner<T>>,
}

impl<T> Clone for WeakCompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakCompletionHandle<T> {
    pub fn upgrade(&self) -> Option<CompletionHandle<T>> {
        self.inner.upgrade().map(|inner| CompletionHandle { inner })
    }
}

/// Every handle clone was dropped before the call was settled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("completion handle dropped without being settled")]
pub struct Abandoned;

/// Await side of a pending call.
///
/// Suspends the task cooperatively; resumes when any handle clone settles.
/// The settled value is handed out once. After that the completion is spent:
/// [`try_take`](Self::try_take) returns `None` and polling yields
/// `Err(Abandoned)` without touching the channel again.
#[derive(Debug)]
pub struct Completion<T> {
    receiver: Option<oneshot::Receiver<T>>,
}

impl<T> Completion<T> {
    /// Wait for the settled value.
    pub async fn wait(self) -> Result<T, Abandoned> {
        self.await
    }

    /// Take the value if already settled, without suspending.
    pub fn try_take(&mut self) -> Option<Result<T, Abandoned>> {
        let receiver = self.receiver.as_mut()?;
        let result = match receiver.try_recv() {
            Ok(value) => Ok(value),
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(Abandoned),
        };
        self.receiver = None;
        Some(result)
    }

    /// Whether the value (or abandonment) has already been handed out.
    pub fn is_spent(&self) -> bool {
        self.receiver.is_none()
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, Abandoned>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(Err(Abandoned));
        };
        let result = ready!(Pin::new(receiver).poll(cx));
        self.receiver = None;
        Poll::Ready(result.map_err(|_| Abandoned))
    }
}
