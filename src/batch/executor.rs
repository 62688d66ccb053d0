//! Batch executor: one dispatch call per batch, results fanned back out.

use super::pending::{PendingRequest, ResultSink};
use crate::Error;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The single call point that performs a batched operation.
///
/// Only the batch worker ever calls `dispatch`, so implementations need not
/// be reentrant or `Sync`. The batcher never passes an empty vector.
/// On success the result at index `i` must answer the payload at index `i`;
/// returning `Err` fails every request in the batch.
pub trait Dispatcher<P, R>: Send + 'static {
    fn dispatch(&mut self, payloads: Vec<P>) -> anyhow::Result<Vec<R>>;
}

impl<P, R, F> Dispatcher<P, R> for F
where
    F: FnMut(Vec<P>) -> anyhow::Result<Vec<R>> + Send + 'static,
{
    fn dispatch(&mut self, payloads: Vec<P>) -> anyhow::Result<Vec<R>> {
        self(payloads)
    }
}

/// What happened to a flushed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Every request received its positional result.
    Delivered(usize),
    /// The dispatcher failed (error or panic); every request received the error.
    Failed(usize),
    /// The dispatcher returned the wrong number of results.
    Mismatch { expected: usize, actual: usize },
}

impl FlushOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FlushOutcome::Delivered(_))
    }

    /// Number of requests in the flushed batch.
    pub fn batch_len(&self) -> usize {
        match *self {
            FlushOutcome::Delivered(n) | FlushOutcome::Failed(n) => n,
            FlushOutcome::Mismatch { expected, .. } => expected,
        }
    }
}

/// Dispatch `batch` once and resolve every request in it.
///
/// A dispatcher error, a panic, or a result vector of the wrong length is
/// turned into one [`Error`] that is delivered to each request not yet
/// resolved. Nothing is retried.
pub fn flush_batch<P, R, D>(dispatcher: &mut D, batch: Vec<PendingRequest<P, R>>) -> FlushOutcome
where
    D: Dispatcher<P, R> + ?Sized,
{
    flush_batch_with(dispatcher, batch, |_| {})
}

/// Like [`flush_batch`], but hands the outcome to `observe` after the
/// dispatch call and before any request is resolved.
pub fn flush_batch_with<P, R, D, F>(
    dispatcher: &mut D,
    batch: Vec<PendingRequest<P, R>>,
    observe: F,
) -> FlushOutcome
where
    D: Dispatcher<P, R> + ?Sized,
    F: FnOnce(FlushOutcome),
{
    let expected = batch.len();
    if expected == 0 {
        return FlushOutcome::Delivered(0);
    }

    let start = Instant::now();
    let oldest_wait = batch
        .iter()
        .map(|r| start.saturating_duration_since(r.enqueued_at))
        .max()
        .unwrap_or(Duration::ZERO);

    let (payloads, mut sinks): (Vec<P>, Vec<ResultSink<R>>) =
        batch.into_iter().map(|r| (r.payload, r.sink)).unzip();

    let dispatched = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(payloads)));

    let (error, outcome) = match dispatched {
        Ok(Ok(results)) if results.len() == expected => {
            debug!(
                batch_len = expected,
                oldest_wait_us = oldest_wait.as_micros() as u64,
                dispatch_us = start.elapsed().as_micros() as u64,
                "batch flushed"
            );
            let outcome = FlushOutcome::Delivered(expected);
            observe(outcome);
            for (sink, result) in sinks.iter_mut().zip(results) {
                sink.resolve(Ok(result));
            }
            return outcome;
        }
        Ok(Ok(results)) => {
            let actual = results.len();
            warn!(expected, actual, "dispatch returned wrong number of results");
            (
                Error::CountMismatch { expected, actual },
                FlushOutcome::Mismatch { expected, actual },
            )
        }
        Ok(Err(e)) => {
            warn!(batch_len = expected, error = %e, "dispatch failed");
            (Error::dispatch(e), FlushOutcome::Failed(expected))
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            warn!(batch_len = expected, panic = %msg, "dispatcher panicked");
            (
                Error::dispatch(anyhow::anyhow!("dispatcher panicked: {}", msg)),
                FlushOutcome::Failed(expected),
            )
        }
    };

    observe(outcome);
    for sink in sinks.iter_mut().filter(|s| !s.is_resolved()) {
        sink.resolve(Err(error.clone()));
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
