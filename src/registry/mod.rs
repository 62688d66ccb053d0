//! 批处理器注册表 — 让互不相关的调用点共享同一个 RequestBatcher
//!
//! Process-wide holder for one shared [`RequestBatcher`], so unrelated call
//! sites reuse a single worker and a single dispatch path.
//!
//! A registry is an ordinary value; make it process-wide by putting it in a
//! `static`:
//!
//! ```rust
//! use once_cell::sync::Lazy;
//! use request_batcher::{BatcherConfig, BatcherRegistry};
//!
//! static ENGINE: Lazy<BatcherRegistry<String, usize>> = Lazy::new(BatcherRegistry::new);
//!
//! fn lengths(xs: Vec<String>) -> anyhow::Result<Vec<usize>> {
//!     Ok(xs.iter().map(|s| s.len()).collect())
//! }
//!
//! let batcher = ENGINE.get_or_create(lengths, BatcherConfig::default()).unwrap();
//! assert_eq!(batcher.submit_sync("hello".to_string()).unwrap(), 5);
//! ENGINE.reset();
//! ```

use crate::batch::{BatcherConfig, Dispatcher, RequestBatcher};
use crate::{Error, ErrorContext, Result};
use arc_swap::ArcSwapOption;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Lazily created, explicitly resettable slot for one shared batcher.
pub struct BatcherRegistry<P, R> {
    slot: ArcSwapOption<RequestBatcher<P, R>>,
    lock: Mutex<()>,
}

impl<P, R> BatcherRegistry<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            lock: Mutex::new(()),
        }
    }

    /// Return the shared batcher, creating it on first use.
    ///
    /// Only the first successful call's `dispatcher` and `config` take effect;
    /// later calls get the existing instance and their arguments are dropped.
    pub fn get_or_create<D>(
        &self,
        dispatcher: D,
        config: BatcherConfig,
    ) -> Result<Arc<RequestBatcher<P, R>>>
    where
        D: Dispatcher<P, R>,
    {
        self.get_or_create_with(move || dispatcher, config)
    }

    /// Like [`get_or_create`](Self::get_or_create), but only builds the
    /// dispatcher when a new batcher is actually created.
    pub fn get_or_create_with<D, F>(
        &self,
        make_dispatcher: F,
        config: BatcherConfig,
    ) -> Result<Arc<RequestBatcher<P, R>>>
    where
        D: Dispatcher<P, R>,
        F: FnOnce() -> D,
    {
        if let Some(existing) = self.slot.load_full() {
            note_reuse(&existing, &config);
            return Ok(existing);
        }

        let _guard = self.creation_guard()?;
        if let Some(existing) = self.slot.load_full() {
            note_reuse(&existing, &config);
            return Ok(existing);
        }

        let batcher = Arc::new(RequestBatcher::new(make_dispatcher(), config)?);
        self.slot.store(Some(Arc::clone(&batcher)));
        debug!(batcher_id = %batcher.id(), "registry created batcher");
        Ok(batcher)
    }

    /// The current batcher, if one has been created.
    pub fn get(&self) -> Option<Arc<RequestBatcher<P, R>>> {
        self.slot.load_full()
    }

    /// Shut down and forget the current batcher. Returns `false` if there was none.
    ///
    /// Holders of the old `Arc` see [`Error::ShutDown`] on further submissions.
    pub fn reset(&self) -> bool {
        // The mutex guards no data; poisoning is irrelevant here.
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        match self.slot.swap(None) {
            Some(old) => {
                old.shutdown();
                debug!(batcher_id = %old.id(), "registry reset batcher");
                true
            }
            None => false,
        }
    }

    fn creation_guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| {
            Error::runtime_with_context(
                "BatcherRegistry lock poisoned",
                ErrorContext::new().with_source("batcher_registry"),
            )
        })
    }
}

impl<P, R> Default for BatcherRegistry<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn note_reuse<P, R>(existing: &RequestBatcher<P, R>, requested: &BatcherConfig) {
    if existing.config() != requested {
        debug!(
            batcher_id = %existing.id(),
            requested_batch_size = requested.batch_size,
            active_batch_size = existing.config().batch_size,
            "registry reusing batcher; requested config ignored"
        );
    }
}
