//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records the size of every batch a dispatcher receives.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<usize>>>);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, n: usize) {
        self.0.lock().unwrap().push(n);
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn total(&self) -> usize {
        self.sizes().iter().sum()
    }
}

/// Dispatcher answering `x` with `x * 10`, recording each batch.
pub fn times_ten(
    calls: Calls,
) -> impl FnMut(Vec<u64>) -> anyhow::Result<Vec<u64>> + Send + 'static {
    move |xs: Vec<u64>| {
        calls.record(xs.len());
        Ok(xs.into_iter().map(|x| x * 10).collect())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("engine rejected batch of {0}")]
pub struct EngineError(pub usize);
