//! Worker counters.

use super::executor::FlushOutcome;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatcherStatsSnapshot {
    pub batches_flushed: u64,
    pub requests_delivered: u64,
    pub requests_failed: u64,
    pub dispatch_failures: u64,
    pub count_mismatches: u64,
    pub largest_batch: usize,
}

impl BatcherStatsSnapshot {
    pub fn requests_total(&self) -> u64 {
        self.requests_delivered + self.requests_failed
    }

    pub fn average_batch_size(&self) -> f64 {
        if self.batches_flushed == 0 {
            0.0
        } else {
            self.requests_total() as f64 / self.batches_flushed as f64
        }
    }
}

/// Lock-free counters shared between a batcher and its worker.
#[derive(Debug, Default)]
pub struct BatcherStats {
    batches_flushed: AtomicU64,
    requests_delivered: AtomicU64,
    requests_failed: AtomicU64,
    dispatch_failures: AtomicU64,
    count_mismatches: AtomicU64,
    largest_batch: AtomicUsize,
}

impl BatcherStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, outcome: FlushOutcome) {
        match outcome {
            FlushOutcome::Delivered(n) => self.record_delivered(n),
            FlushOutcome::Failed(n) => self.record_dispatch_failure(n),
            FlushOutcome::Mismatch { expected, .. } => self.record_mismatch(expected),
        }
    }

    fn record_delivered(&self, n: usize) {
        self.record_batch(n);
        self.requests_delivered.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn record_dispatch_failure(&self, n: usize) {
        self.record_batch(n);
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
        self.requests_failed.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn record_mismatch(&self, n: usize) {
        self.record_batch(n);
        self.count_mismatches.fetch_add(1, Ordering::Relaxed);
        self.requests_failed.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn record_batch(&self, n: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.largest_batch.fetch_max(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BatcherStatsSnapshot {
        BatcherStatsSnapshot {
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            requests_delivered: self.requests_delivered.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            count_mismatches: self.count_mismatches.load(Ordering::Relaxed),
            largest_batch: self.largest_batch.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snap = BatcherStats::new().snapshot();
        assert_eq!(snap, BatcherStatsSnapshot::default());
        assert_eq!(snap.average_batch_size(), 0.0);
    }

    #[test]
    fn test_counters() {
        let stats = BatcherStats::new();
        stats.record_delivered(4);
        stats.record_delivered(2);
        stats.record_dispatch_failure(3);
        stats.record_mismatch(1);

        let snap = stats.snapshot();
        assert_eq!(snap.batches_flushed, 4);
        assert_eq!(snap.requests_delivered, 6);
        assert_eq!(snap.requests_failed, 4);
        assert_eq!(snap.dispatch_failures, 1);
        assert_eq!(snap.count_mismatches, 1);
        assert_eq!(snap.largest_batch, 4);
        assert_eq!(snap.requests_total(), 10);
        assert!((snap.average_batch_size() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_outcome() {
        let stats = BatcherStats::new();
        stats.record(FlushOutcome::Delivered(3));
        stats.record(FlushOutcome::Failed(2));
        stats.record(FlushOutcome::Mismatch {
            expected: 5,
            actual: 6,
        });

        let snap = stats.snapshot();
        assert_eq!(snap.batches_flushed, 3);
        assert_eq!(snap.requests_delivered, 3);
        assert_eq!(snap.requests_failed, 7);
        assert_eq!(snap.dispatch_failures, 1);
        assert_eq!(snap.count_mismatches, 1);
        assert_eq!(snap.largest_batch, 5);
    }
}
