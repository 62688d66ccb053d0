//! Pending requests and their single-assignment result slots.
//!
//! A [`ResultSink`] and a [`ResultHandle`] are the two ends of one result
//! cell. The worker owns the sink; the caller owns the handle and observes the
//! result either by blocking ([`ResultHandle::wait`]) or by awaiting the handle.

use crate::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;

/// Write end of a result cell. Resolves at most once.
pub struct ResultSink<R> {
    tx: Option<oneshot::Sender<Result<R>>>,
}

impl<R> ResultSink<R> {
    /// Resolve the slot. Returns `false` (and drops `result`) if it was
    /// already resolved.
    ///
    /// A caller that has gone away (dropped its handle) still counts as
    /// resolved; the result is discarded.
    pub fn resolve(&mut self, result: Result<R>) -> bool {
        match self.tx.take() {
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.is_none()
    }
}

impl<R> std::fmt::Debug for ResultSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSink")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Read end of a result cell.
///
/// Dropping the matching [`ResultSink`] unresolved yields [`Error::Abandoned`],
/// so a handle never waits forever on a request nobody will answer.
#[must_use = "a ResultHandle does nothing unless waited on or awaited"]
pub struct ResultHandle<R> {
    rx: oneshot::Receiver<Result<R>>,
}

impl<R> ResultHandle<R> {
    /// Block the current thread until the result is available.
    ///
    /// Safe to call from any thread, including a tokio runtime worker, where
    /// it stalls that worker for the duration. Prefer awaiting the handle in
    /// async code.
    pub fn wait(self) -> Result<R> {
        futures::executor::block_on(self.rx).unwrap_or_else(|_| Err(Error::Abandoned))
    }
}

impl<R> Future for ResultHandle<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| Err(Error::Abandoned)))
    }
}

impl<R> std::fmt::Debug for ResultHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle").finish_non_exhaustive()
    }
}

/// Create a connected sink/handle pair.
pub fn result_slot<R>() -> (ResultSink<R>, ResultHandle<R>) {
    let (tx, rx) = oneshot::channel();
    (ResultSink { tx: Some(tx) }, ResultHandle { rx })
}

/// A caller's payload paired with the slot its result goes into.
pub struct PendingRequest<P, R> {
    pub payload: P,
    pub sink: ResultSink<R>,
    pub enqueued_at: Instant,
}

impl<P, R> PendingRequest<P, R> {
    pub fn new(payload: P) -> (Self, ResultHandle<R>) {
        let (sink, handle) = result_slot();
        (
            Self {
                payload,
                sink,
                enqueued_at: Instant::now(),
            },
            handle,
        )
    }

    pub fn resolve(&mut self, result: Result<R>) -> bool {
        self.sink.resolve(result)
    }
}

impl<P: std::fmt::Debug, R> std::fmt::Debug for PendingRequest<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("payload", &self.payload)
            .field("sink", &self.sink)
            .finish()
    }
}
