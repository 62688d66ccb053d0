//! Shutdown, drain and liveness.

mod common;

use common::{init_tracing, times_ten, Calls};
use request_batcher::{BatcherConfig, Error, RequestBatcher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_shutdown_drains_enqueued_request() {
    init_tracing();
    let calls = Calls::new();
    let batcher = RequestBatcher::new(
        times_ten(calls.clone()),
        BatcherConfig::new()
            .with_batch_size(100)
            .with_flush_interval(Duration::from_secs(10)),
    )
    .unwrap();

    let handle = batcher.submit(7).unwrap();
    let started = Instant::now();
    batcher.shutdown();

    // Resolved by the time shutdown returned, without waiting out the interval.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(batcher.stats().requests_total(), 1);
    assert_eq!(calls.total(), 1);
    assert_eq!(handle.wait().unwrap(), 70);
}

#[test]
fn test_shutdown_flushes_backlog_in_bounded_batches() {
    let calls = Calls::new();
    let dispatch_calls = calls.clone();
    let batcher = RequestBatcher::new(
        move |xs: Vec<u64>| -> anyhow::Result<Vec<u64>> {
            dispatch_calls.record(xs.len());
            thread::sleep(Duration::from_millis(20));
            Ok(xs)
        },
        BatcherConfig::new()
            .with_batch_size(4)
            .with_flush_interval(Duration::from_millis(1)),
    )
    .unwrap();

    let handles: Vec<_> = (0..30u64).map(|i| batcher.submit(i).unwrap()).collect();
    batcher.shutdown();

    for (i, h) in handles.into_iter().enumerate() {
        assert_eq!(assert_ok!(h.wait()), i as u64);
    }
    assert_eq!(calls.total(), 30);
    assert!(calls.sizes().iter().all(|n| *n <= 4));
}

#[test]
fn test_submit_after_shutdown_fails_fast() {
    let batcher = RequestBatcher::new(times_ten(Calls::new()), BatcherConfig::default()).unwrap();
    batcher.shutdown();
    batcher.shutdown();
    assert!(matches!(assert_err!(batcher.submit(1)), Error::ShutDown));
}

#[tokio::test]
async fn test_async_submit_after_shutdown() {
    let batcher = RequestBatcher::new(times_ten(Calls::new()), BatcherConfig::default()).unwrap();
    batcher.shutdown();
    assert!(matches!(batcher.submit_async(1).await, Err(Error::ShutDown)));
}

#[test]
fn test_drop_resolves_pending_requests() {
    let batcher = RequestBatcher::new(
        times_ten(Calls::new()),
        BatcherConfig::new()
            .with_batch_size(100)
            .with_flush_interval(Duration::from_secs(10)),
    )
    .unwrap();
    let handle = batcher.submit(2).unwrap();
    drop(batcher);
    assert_eq!(handle.wait().unwrap(), 20);
}

#[test]
fn test_no_request_lost_when_shutdown_races_submitters() {
    let batcher = Arc::new(
        RequestBatcher::new(
            times_ten(Calls::new()),
            BatcherConfig::new()
                .with_batch_size(16)
                .with_flush_interval(Duration::from_micros(200)),
        )
        .unwrap(),
    );
    let stop = Arc::new(AtomicBool::new(false));

    let submitters: Vec<_> = (0..6u64)
        .map(|t| {
            let batcher = Arc::clone(&batcher);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let (mut ok, mut rejected) = (0u64, 0u64);
                let mut i = 0u64;
                while !stop.load(Ordering::SeqCst) {
                    let payload = t * 1_000_000 + i;
                    match batcher.submit_sync(payload) {
                        Ok(v) => {
                            assert_eq!(v, payload * 10);
                            ok += 1;
                        }
                        Err(Error::ShutDown) | Err(Error::Abandoned) => rejected += 1,
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                    i += 1;
                }
                (ok, rejected)
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    batcher.shutdown();
    thread::sleep(Duration::from_millis(20));
    stop.store(true, Ordering::SeqCst);

    let mut delivered = 0;
    for s in submitters {
        // Every call returned, so nothing was left hanging.
        let (ok, _rejected) = s.join().unwrap();
        delivered += ok;
    }
    assert!(delivered > 0);
    assert_eq!(batcher.stats().requests_delivered, delivered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_liveness_under_mixed_load() {
    let calls = Calls::new();
    let batcher = Arc::new(
        RequestBatcher::new(
            times_ten(calls.clone()),
            BatcherConfig::new()
                .with_batch_size(32)
                .with_flush_interval(Duration::from_micros(100)),
        )
        .unwrap(),
    );

    let mut tasks = Vec::new();
    for t in 0..8u64 {
        let batcher = Arc::clone(&batcher);
        tasks.push(tokio::spawn(async move {
            for i in 0..50u64 {
                let payload = t * 1000 + i;
                assert_eq!(batcher.submit_async(payload).await.unwrap(), payload * 10);
            }
        }));
    }
    for t in 0..4u64 {
        let batcher = Arc::clone(&batcher);
        tasks.push(tokio::task::spawn_blocking(move || {
            for i in 0..50u64 {
                let payload = 100_000 + t * 1000 + i;
                assert_eq!(batcher.submit_sync(payload).unwrap(), payload * 10);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    batcher.shutdown();
    assert_eq!(calls.total(), 600);
    assert_eq!(batcher.stats().requests_delivered, 600);
}
