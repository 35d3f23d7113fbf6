//! Shared cancellation for pipeline stages.
//!
//! Every queue push and pop in the pipeline goes through [`send_or_cancel`]
//! or [`recv_or_cancel`], which select on the stage's queue and on the
//! token's signal channel at the same time. Cancelling drops the only sender
//! of that signal channel, so every blocked `select!` wakes up at once.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Why a token was cancelled. The first reason recorded wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `cancel()` called from outside, e.g. by a signal handler.
    Requested,
    /// The pipeline's deadline elapsed.
    Deadline,
    /// A stage hit a fatal error and is tearing the run down.
    StageFailed,
}

impl CancelReason {
    fn code(self) -> u8 {
        match self {
            CancelReason::Requested => 1,
            CancelReason::Deadline => 2,
            CancelReason::StageFailed => 3,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(CancelReason::Requested),
            2 => Some(CancelReason::Deadline),
            3 => Some(CancelReason::StageFailed),
            _ => None,
        }
    }
}

struct CancelInner {
    cancelled: AtomicBool,
    reason: AtomicU8,
    trigger: Mutex<Option<Sender<()>>>,
}

/// Cloneable handle that can stop a pipeline run from any thread.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                reason: AtomicU8::new(0),
                trigger: Mutex::new(Some(trigger)),
            }),
            signal,
        }
    }

    /// Ask the pipeline to stop. Safe to call repeatedly and from any thread.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::Requested);
    }

    pub(crate) fn cancel_with(&self, reason: CancelReason) {
        let _ = self
            .inner
            .reason
            .compare_exchange(0, reason.code(), Ordering::SeqCst, Ordering::SeqCst);
        self.inner.cancelled.store(true, Ordering::SeqCst);

        // Dropping the sender disconnects the signal channel for every clone
        let mut trigger = match self.inner.trigger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        trigger.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<CancelReason> {
        CancelReason::from_code(self.inner.reason.load(Ordering::SeqCst))
    }

    /// Becomes ready (disconnected) once the token is cancelled.
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

/// A blocking queue operation was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupted {
    /// The token fired.
    Cancelled,
    /// The other end of the queue is gone, which only happens when a
    /// downstream stage died.
    Disconnected,
}

/// Push onto a bounded queue, blocking while it is full unless cancelled.
pub(crate) fn send_or_cancel<T>(
    tx: &Sender<T>,
    msg: T,
    cancel: &CancelToken,
) -> Result<(), Interrupted> {
    if cancel.is_cancelled() {
        return Err(Interrupted::Cancelled);
    }
    select! {
        send(tx, msg) -> res => res.map_err(|_| Interrupted::Disconnected),
        recv(cancel.signal()) -> _ => Err(Interrupted::Cancelled),
    }
}

/// Pop from a queue, blocking while it is empty unless cancelled.
/// `Ok(None)` means the queue is closed and drained.
pub(crate) fn recv_or_cancel<T>(
    rx: &Receiver<T>,
    cancel: &CancelToken,
) -> Result<Option<T>, Interrupted> {
    if cancel.is_cancelled() {
        return Err(Interrupted::Cancelled);
    }
    select! {
        recv(rx) -> msg => Ok(msg.ok()),
        recv(cancel.signal()) -> _ => Err(Interrupted::Cancelled),
    }
}
