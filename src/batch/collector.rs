//! Batch collection: size trigger vs. time trigger.

use super::config::BatcherConfig;
use super::pending::PendingRequest;
use super::queue::{Dequeued, QueueReceiver};
use std::time::{Duration, Instant};

/// Outcome of one collection round.
pub struct Collected<P, R> {
    pub batch: Vec<PendingRequest<P, R>>,
    /// The stop sentinel was read during this round.
    pub stop_seen: bool,
}

impl<P, R> Collected<P, R> {
    fn idle() -> Self {
        Self {
            batch: Vec::new(),
            stop_seen: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }
}

/// Pull one batch off the queue.
///
/// Waits up to `poll_interval` for a first request. Once one arrives the
/// batch keeps growing until it holds `batch_size` requests, `flush_interval`
/// has elapsed since that first request, or the stop sentinel shows up.
pub fn collect_batch<P, R>(rx: &QueueReceiver<P, R>, config: &BatcherConfig) -> Collected<P, R> {
    let first = match rx.dequeue_blocking(config.poll_interval) {
        Dequeued::Item(req) => req,
        Dequeued::Stop => {
            return Collected {
                batch: Vec::new(),
                stop_seen: true,
            }
        }
        Dequeued::Empty => return Collected::idle(),
    };

    let batch_size = config.batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size.min(256));
    batch.push(first);

    // None: the interval is too large to represent, so only size or stop end the round.
    let deadline = Instant::now().checked_add(config.flush_interval);
    let mut stop_seen = false;

    while batch.len() < batch_size {
        let remaining = match deadline {
            Some(d) => d.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        };
        if remaining.is_zero() {
            break;
        }
        match rx.dequeue_blocking(remaining) {
            Dequeued::Item(req) => batch.push(req),
            Dequeued::Stop => {
                stop_seen = true;
                break;
            }
            Dequeued::Empty => break,
        }
    }

    Collected { batch, stop_seen }
}
