//! 请求微批处理模块：将独立提交的请求聚合为小批次，通过单次调度调用发送。
//!
//! # Request Micro-Batching Module
//!
//! This module groups independently submitted requests into small batches and
//! forwards each batch through a single call to a slow, per-call dispatch
//! primitive (for example an RPC to an external engine), then fans the results
//! back out to the original callers.
//!
//! ## Overview
//!
//! Micro-batching amortizes fixed per-call overhead across concurrent traffic:
//! - Callers submit one request at a time and never see the batch
//! - Blocking threads and async tasks share the same batcher
//! - A batch is bounded by both a size trigger and a time trigger
//! - The dispatcher runs on exactly one dedicated worker thread
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestBatcher`] | Owns the queue and worker; `submit_sync` / `submit_async` / `shutdown` |
//! | [`BatcherConfig`] | Batch size, flush interval, poll interval, join timeout |
//! | [`Dispatcher`] | The batched call point (any `FnMut(Vec<P>) -> anyhow::Result<Vec<R>>`) |
//! | [`PendingRequest`] | A payload paired with its single-assignment [`ResultSink`] |
//! | [`ResultHandle`] | Caller side of a result: `wait()` or `.await` |
//! | [`BatchQueue`] | Unbounded FIFO of requests plus a stop sentinel |
//! | [`collect_batch`] | One collection round (size vs. time trigger) |
//! | [`flush_batch`] | One dispatch call, results or one shared error fanned out |
//! | [`BatcherStats`] | Counters for flushed batches and failures |
//!
//! ## Example
//!
//! ```rust
//! use request_batcher::batch::{BatcherConfig, RequestBatcher};
//! use std::time::Duration;
//!
//! let config = BatcherConfig::new()
//!     .with_batch_size(16)
//!     .with_flush_interval(Duration::from_micros(500));
//!
//! let batcher = RequestBatcher::new(
//!     |words: Vec<String>| -> anyhow::Result<Vec<usize>> {
//!         Ok(words.iter().map(|w| w.len()).collect())
//!     },
//!     config,
//! )?;
//!
//! assert_eq!(batcher.submit_sync("batch".to_string())?, 5);
//! batcher.shutdown();
//! # Ok::<(), request_batcher::Error>(())
//! ```
//!
//! ## Triggers
//!
//! - **Size**: a batch is flushed as soon as it holds `batch_size` requests
//! - **Time**: a partial batch is flushed `flush_interval` after its first request arrived
//! - **Shutdown**: everything still queued is drained and flushed before the worker exits

mod batcher;
mod collector;
mod config;
mod executor;
mod pending;
mod queue;
mod stats;

pub use batcher::RequestBatcher;
pub use collector::{collect_batch, Collected};
pub use config::{
    BatcherConfig, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_JOIN_TIMEOUT,
    DEFAULT_POLL_INTERVAL, DEFAULT_THREAD_NAME,
};
pub use executor::{flush_batch, flush_batch_with, Dispatcher, FlushOutcome};
pub use pending::{result_slot, PendingRequest, ResultHandle, ResultSink};
pub use queue::{BatchQueue, Dequeued, QueueItem, QueueReceiver};
pub use stats::{BatcherStats, BatcherStatsSnapshot};
