//! # request-batcher
//!
//! 客户端微批处理层：将大量独立请求聚合为小批次，通过单次调度调用转发给远端引擎。
//!
//! Client-side micro-batching in front of a slow, per-call dispatch primitive.
//!
//! ## Overview
//!
//! Many independent callers, both blocking threads and async tasks, submit
//! individual requests. The batcher accumulates them into small batches,
//! forwards each batch through one dispatch call on a dedicated worker thread,
//! and hands every caller its own positional result (or the batch's error).
//! Callers never need to know that batching happens.
//!
//! ## Key Features
//!
//! - **Dual entry points**: [`RequestBatcher::submit_sync`] blocks a thread,
//!   [`RequestBatcher::submit_async`] suspends only the calling task
//! - **Two triggers**: flush on `batch_size` or after `flush_interval`, whichever comes first
//! - **Single dispatch point**: the [`Dispatcher`] is only ever called from one worker thread
//! - **Failure fan-out**: one dispatch error reaches every caller in the batch
//! - **Lossless shutdown**: queued requests are drained and flushed before the worker exits
//! - **Shared instance**: [`BatcherRegistry`] lets unrelated call sites reuse one batcher
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use request_batcher::{BatcherConfig, RequestBatcher};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> request_batcher::Result<()> {
//!     let batcher = Arc::new(RequestBatcher::new(
//!         |ids: Vec<u64>| -> anyhow::Result<Vec<String>> {
//!             // One round-trip to the engine for the whole batch.
//!             Ok(ids.iter().map(|id| format!("item-{id}")).collect())
//!         },
//!         BatcherConfig::new()
//!             .with_batch_size(32)
//!             .with_flush_interval(Duration::from_micros(100)),
//!     )?);
//!
//!     let name = batcher.submit_async(7).await?;
//!     assert_eq!(name, "item-7");
//!
//!     batcher.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Queue, collector, flush, worker and the `RequestBatcher` itself |
//! | [`registry`] | Process-wide shared batcher with explicit reset |
//! | [`error`] | Error type shared by all batch outcomes |

pub mod batch;
pub mod registry;

pub use batch::{BatcherConfig, BatcherStatsSnapshot, Dispatcher, RequestBatcher, ResultHandle};
pub use registry::BatcherRegistry;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
