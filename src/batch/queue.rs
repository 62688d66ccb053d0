//! Unbounded FIFO between submitters and the batch worker.

use super::pending::PendingRequest;
use crate::{Error, Result};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// An element of the queue: a request, or the sentinel telling the worker to stop.
pub enum QueueItem<P, R> {
    Request(PendingRequest<P, R>),
    Stop,
}

/// Result of a bounded blocking read.
pub enum Dequeued<P, R> {
    Item(PendingRequest<P, R>),
    Stop,
    /// Nothing arrived before the timeout.
    Empty,
}

impl<P, R> Dequeued<P, R> {
    pub fn is_stop(&self) -> bool {
        matches!(self, Dequeued::Stop)
    }
}

/// Producer side. Cheap to clone, safe to share between threads.
pub struct BatchQueue<P, R> {
    tx: mpsc::Sender<QueueItem<P, R>>,
}

/// Consumer side, owned by the worker.
pub struct QueueReceiver<P, R> {
    rx: mpsc::Receiver<QueueItem<P, R>>,
}

impl<P, R> BatchQueue<P, R> {
    pub fn new() -> (Self, QueueReceiver<P, R>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, QueueReceiver { rx })
    }

    /// Enqueue a request. Never blocks.
    ///
    /// Fails only once the worker has gone away; the rejected request is
    /// resolved with [`Error::ShutDown`] before returning.
    pub fn enqueue(&self, request: PendingRequest<P, R>) -> Result<()> {
        match self.tx.send(QueueItem::Request(request)) {
            Ok(()) => Ok(()),
            Err(mpsc::SendError(item)) => {
                if let QueueItem::Request(mut rejected) = item {
                    rejected.resolve(Err(Error::ShutDown));
                }
                Err(Error::ShutDown)
            }
        }
    }

    /// Enqueue the stop sentinel. Returns `false` if the worker is already gone.
    pub fn send_stop(&self) -> bool {
        self.tx.send(QueueItem::Stop).is_ok()
    }
}

impl<P, R> Clone for BatchQueue<P, R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P, R> QueueReceiver<P, R> {
    /// Wait up to `timeout` for the next element.
    ///
    /// A queue whose producers are all gone reads as [`Dequeued::Stop`].
    pub fn dequeue_blocking(&self, timeout: Duration) -> Dequeued<P, R> {
        match self.rx.recv_timeout(timeout) {
            Ok(QueueItem::Request(req)) => Dequeued::Item(req),
            Ok(QueueItem::Stop) => Dequeued::Stop,
            Err(RecvTimeoutError::Timeout) => Dequeued::Empty,
            Err(RecvTimeoutError::Disconnected) => Dequeued::Stop,
        }
    }

    /// Take everything currently queued without blocking, skipping sentinels.
    pub fn drain_nonblocking(&self) -> Vec<PendingRequest<P, R>> {
        let mut drained = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(QueueItem::Request(req)) => drained.push(req),
                Ok(QueueItem::Stop) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }
}
