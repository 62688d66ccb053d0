//! The request batcher: submit entry points, background worker, shutdown.

use super::collector::collect_batch;
use super::config::BatcherConfig;
use super::executor::{flush_batch_with, Dispatcher};
use super::pending::{PendingRequest, ResultHandle};
use super::queue::{BatchQueue, QueueReceiver};
use super::stats::{BatcherStats, BatcherStatsSnapshot};
use crate::{Error, ErrorContext, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};
use uuid::Uuid;

struct WorkerHandle {
    thread: JoinHandle<()>,
    done: mpsc::Receiver<()>,
}

/// Groups individually submitted requests into batches and sends each batch
/// through one [`Dispatcher`] call on a dedicated worker thread.
///
/// Configuration is fixed at construction. The worker starts immediately and
/// runs until [`shutdown`](Self::shutdown) (or drop), after which every request
/// that made it into the queue has been resolved.
pub struct RequestBatcher<P, R> {
    id: Uuid,
    config: BatcherConfig,
    queue: BatchQueue<P, R>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<BatcherStats>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl<P, R> RequestBatcher<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Validate `config` and start the worker thread.
    pub fn new<D>(dispatcher: D, config: BatcherConfig) -> Result<Self>
    where
        D: Dispatcher<P, R>,
    {
        config.validate()?;

        let id = Uuid::new_v4();
        let (queue, rx) = BatchQueue::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(BatcherStats::new());
        let (done_tx, done_rx) = mpsc::channel();

        let worker = Worker {
            id,
            rx,
            dispatcher,
            config: config.clone(),
            shutdown: Arc::clone(&shutdown),
            stats: Arc::clone(&stats),
        };
        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                worker.run();
                let _ = done_tx.send(());
            })
            .map_err(|e| {
                Error::runtime_with_context(
                    "failed to spawn batch worker",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("request_batcher"),
                )
            })?;

        Ok(Self {
            id,
            config,
            queue,
            shutdown,
            stats,
            worker: Mutex::new(Some(WorkerHandle {
                thread,
                done: done_rx,
            })),
        })
    }

    pub fn with_defaults<D>(dispatcher: D) -> Result<Self>
    where
        D: Dispatcher<P, R>,
    {
        Self::new(dispatcher, BatcherConfig::default())
    }
}

impl<P, R> RequestBatcher<P, R> {
    /// Enqueue `payload` and return a handle to its eventual result.
    pub fn submit(&self, payload: P) -> Result<ResultHandle<R>> {
        if self.is_shut_down() {
            return Err(Error::ShutDown);
        }
        let (request, handle) = PendingRequest::new(payload);
        self.queue.enqueue(request)?;
        Ok(handle)
    }

    /// Submit and block the calling thread until the result arrives.
    ///
    /// Inside a tokio runtime this blocks the runtime worker; use
    /// [`submit_async`](Self::submit_async) there.
    pub fn submit_sync(&self, payload: P) -> Result<R> {
        self.submit(payload)?.wait()
    }

    /// Submit and suspend the calling task (not its thread) until the result arrives.
    pub async fn submit_async(&self, payload: P) -> Result<R> {
        self.submit(payload)?.await
    }

    /// Stop accepting requests, let the worker flush whatever is queued, and
    /// wait up to `join_timeout` for it to exit. Later calls are no-ops.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.queue.send_stop();

        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(worker) = worker else {
            return;
        };

        match worker.done.recv_timeout(self.config.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.thread.join().is_err() {
                    warn!(batcher_id = %self.id, "batch worker panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    batcher_id = %self.id,
                    timeout_ms = self.config.join_timeout.as_millis() as u64,
                    "batch worker did not stop in time; detaching"
                );
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Unique id of this instance, used in logs and for identity checks.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    pub fn stats(&self) -> BatcherStatsSnapshot {
        self.stats.snapshot()
    }
}

impl<P, R> Drop for RequestBatcher<P, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<P, R> std::fmt::Debug for RequestBatcher<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBatcher")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// State owned by the worker thread.
struct Worker<P, R, D> {
    id: Uuid,
    rx: QueueReceiver<P, R>,
    dispatcher: D,
    config: BatcherConfig,
    shutdown: Arc<AtomicBool>,
    stats: Arc<BatcherStats>,
}

impl<P, R, D> Worker<P, R, D>
where
    D: Dispatcher<P, R>,
{
    fn run(mut self) {
        debug!(
            batcher_id = %self.id,
            batch_size = self.config.batch_size,
            flush_interval_us = self.config.flush_interval.as_micros() as u64,
            "batch worker started"
        );

        let mut stop_seen = false;
        while !stop_seen && !self.shutdown.load(Ordering::SeqCst) {
            let collected = collect_batch(&self.rx, &self.config);
            stop_seen = collected.stop_seen;
            if !collected.is_empty() {
                self.flush(collected.batch);
            }
        }

        // Final drain: anything enqueued before this point still gets flushed.
        let leftovers = self.rx.drain_nonblocking();
        let drained = leftovers.len();
        let mut leftovers = leftovers.into_iter().peekable();
        while leftovers.peek().is_some() {
            let chunk: Vec<_> = leftovers.by_ref().take(self.config.batch_size).collect();
            self.flush(chunk);
        }

        debug!(batcher_id = %self.id, drained, "batch worker stopped");
    }

    fn flush(&mut self, batch: Vec<PendingRequest<P, R>>) {
        // Counters are settled before any caller is woken.
        let stats = &self.stats;
        flush_batch_with(&mut self.dispatcher, batch, |outcome| stats.record(outcome));
    }
}
