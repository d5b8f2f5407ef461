//! Integration tests for the shared broker handle and its sweeper.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::time::Duration;

use chrono::Utc;
use job_broker::broker::{Broker, SweepConfig};
use job_broker::error::Error;
use job_broker::model::*;
use serde_json::json;

#[test]
fn clones_share_one_store() {
    let producer = Broker::new();
    let worker = producer.clone();

    producer.submit(NewJob::new("1", "http://x", "t")).unwrap();
    let claimed = worker.claim().unwrap();
    assert_eq!(claimed.id, "1");

    worker
        .report(Report::new("1", "http://x", json!("ok")).completed(true))
        .unwrap();
    let done = producer.fetch_result("1").unwrap();
    assert_eq!(done.result, Some(json!("ok")));
}

#[test]
fn concurrent_submits_of_one_id_admit_exactly_one() {
    const THREADS: usize = 8;
    let broker = Broker::new();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let broker = broker.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                broker.submit(NewJob::new("x", "http://x", "t"))
            })
        })
        .collect();

    let mut accepted = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(()) => accepted += 1,
            Err(Error::Duplicate { id }) => {
                assert_eq!(id, "x");
                duplicates += 1;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(duplicates, THREADS - 1);
    assert_eq!(broker.summaries().pending.len(), 1);
}

#[test]
fn concurrent_claims_never_hand_out_the_same_job() {
    let broker = Broker::new();
    for i in 0..200 {
        broker
            .submit(NewJob::new(i.to_string(), format!("http://x/{i}"), "t"))
            .unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let broker = broker.clone();
            std::thread::spawn(move || {
                let mut mine = Vec::new();
                while let Ok(job) = broker.claim() {
                    mine.push(job.id);
                }
                mine
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id.clone()), "job {id} claimed twice");
        }
    }
    assert_eq!(seen.len(), 200);
    assert!(matches!(broker.claim(), Err(Error::EmptyQueue)));
}

#[test]
fn sweep_through_handle_evicts_stale_work() {
    let broker = Broker::new();
    broker.submit(NewJob::new("a", "http://x", "t")).unwrap();
    broker.claim().unwrap();

    let report = broker.sweep(
        Utc::now() + chrono::Duration::minutes(10),
        chrono::Duration::minutes(5),
    );
    assert_eq!(report.in_progress, ["a"]);
    assert!(broker.summaries().in_progress.is_empty());
}

#[tokio::test]
async fn background_sweeper_evicts_unreported_jobs() {
    let broker = Broker::new();
    broker.submit(NewJob::new("a", "http://x", "t")).unwrap();
    broker.submit(NewJob::new("b", "http://y", "t")).unwrap();
    broker.claim().unwrap();

    let sweeper = broker
        .spawn_sweeper(SweepConfig {
            interval: Duration::from_millis(20),
            stale_after: Duration::ZERO,
        })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    let snapshot = broker.summaries();
    assert!(snapshot.in_progress.is_empty());
    assert_eq!(snapshot.pending.len(), 1, "pending jobs are never swept");

    broker.shutdown();
    tokio::time::timeout(Duration::from_secs(1), sweeper)
        .await
        .expect("sweeper did not stop")
        .unwrap();
}

#[tokio::test]
async fn sweeper_exits_when_broker_is_dropped() {
    let broker = Broker::new();
    let sweeper = broker
        .spawn_sweeper(SweepConfig {
            interval: Duration::from_millis(10),
            stale_after: Duration::from_secs(300),
        })
        .unwrap();
    drop(broker);

    tokio::time::timeout(Duration::from_secs(1), sweeper)
        .await
        .expect("sweeper outlived its broker")
        .unwrap();
}

#[test]
fn zero_sweep_interval_is_rejected() {
    let broker = Broker::new();
    let result = broker.spawn_sweeper(SweepConfig {
        interval: Duration::ZERO,
        stale_after: Duration::from_secs(1),
    });
    assert!(matches!(result, Err(Error::Config(_))));
}
