// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduler cycle tests.
//!
//! These tests verify that:
//! 1. One runner failing (error or panic) does not stop the others
//! 2. A failing runner list aborts the cycle without touching rows
//! 3. Only one cycle is in flight, even when a manual caller goes away

use runner_stats::db::{MemoryStore, StatisticsStore};
use runner_stats::models::{PeriodKey, PeriodKind};
use runner_stats::services::{StatisticsAggregator, StatisticsScheduler};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{anchor, record, Fault, FaultyRecordStore};

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_record(record("a1", "A", anchor(), 30, 5.0));
    store.insert_record(record("b1", "B", anchor(), 45, 7.5));
    store.insert_record(record("c1", "C", anchor(), 60, 10.0));
    store
}

fn faulty_scheduler(store: Arc<MemoryStore>, fault: Fault) -> StatisticsScheduler {
    let records = Arc::new(FaultyRecordStore {
        inner: store.clone(),
        runner: "B".to_string(),
        fault,
    });
    let aggregator = Arc::new(StatisticsAggregator::new(records, store));
    StatisticsScheduler::new(aggregator, Duration::from_secs(3600), 2)
}

async fn assert_anchor_rows(store: &MemoryStore, runner: &str, expected: usize) {
    let mut found = 0;
    for kind in PeriodKind::ALL {
        let key = PeriodKey::resolve(kind, anchor());
        if store.find_statistics(runner, &key).await.unwrap().is_some() {
            found += 1;
        }
    }
    assert_eq!(found, expected, "rows for runner {}", runner);
}

#[tokio::test]
async fn test_failing_runner_does_not_block_others() {
    let store = seeded_store();
    let scheduler = faulty_scheduler(store.clone(), Fault::Error);

    let report = scheduler.run_cycle_at(anchor()).await;

    assert_eq!(report.runners, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, vec!["B".to_string()]);
    assert!(!report.listing_failed);

    assert_anchor_rows(&store, "A", 3).await;
    assert_anchor_rows(&store, "B", 0).await;
    assert_anchor_rows(&store, "C", 3).await;
}

#[tokio::test]
async fn test_panicking_runner_does_not_block_others() {
    let store = seeded_store();
    let scheduler = faulty_scheduler(store.clone(), Fault::Panic);

    let report = scheduler.run_cycle_at(anchor()).await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, vec!["B".to_string()]);

    assert_anchor_rows(&store, "A", 3).await;
    assert_anchor_rows(&store, "C", 3).await;
}

#[tokio::test]
async fn test_runner_listing_failure_skips_cycle() {
    let offline = Arc::new(common::test_db_offline());
    let aggregator = Arc::new(StatisticsAggregator::new(offline.clone(), offline));
    let scheduler = StatisticsScheduler::new(aggregator, Duration::from_secs(3600), 4);

    let report = scheduler.run_cycle_now().await;

    assert!(report.listing_failed);
    assert_eq!(report.runners, 0);
    assert_eq!(report.succeeded, 0);
}

#[tokio::test]
async fn test_upsert_failure_is_reported_per_runner() {
    let store = seeded_store();
    let aggregator = Arc::new(StatisticsAggregator::new(
        store,
        common::offline_statistics(),
    ));
    let scheduler = StatisticsScheduler::new(aggregator, Duration::from_secs(3600), 4);

    let report = scheduler.run_cycle_at(anchor()).await;

    assert_eq!(report.runners, 3);
    assert_eq!(report.succeeded, 0);
    assert_eq!(
        report.failed,
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    );
}

#[tokio::test]
async fn test_repeated_cycles_are_idempotent() {
    let store = seeded_store();
    let aggregator = Arc::new(StatisticsAggregator::new(store.clone(), store.clone()));
    let scheduler = StatisticsScheduler::new(aggregator, Duration::from_secs(3600), 4);
    let key = PeriodKey::resolve(PeriodKind::Weekly, anchor());

    scheduler.run_cycle_at(anchor()).await;
    let first = store.find_statistics("C", &key).await.unwrap().unwrap();

    scheduler.run_cycle_at(anchor()).await;
    let second = store.find_statistics("C", &key).await.unwrap().unwrap();

    assert_eq!(store.statistics_count(), 9);
    assert!(first.same_aggregates(&second));
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(second.total_distance_km, 10.0);
}

#[tokio::test]
async fn test_concurrent_manual_triggers_serialize() {
    let store = seeded_store();
    let aggregator = Arc::new(StatisticsAggregator::new(store.clone(), store.clone()));
    let scheduler = Arc::new(StatisticsScheduler::new(
        aggregator,
        Duration::from_secs(3600),
        4,
    ));

    let (a, b) = tokio::join!(
        scheduler.run_cycle_at(anchor()),
        scheduler.run_cycle_at(anchor())
    );

    // Neither trigger is dropped; both run to completion one after the other.
    assert!(!a.skipped && !b.skipped);
    assert_eq!(a.succeeded, 3);
    assert_eq!(b.succeeded, 3);
    assert_eq!(store.statistics_count(), 9);
}

#[tokio::test]
async fn test_cancelled_manual_cycle_keeps_the_cycle_lock() {
    let store = seeded_store();
    let scheduler = faulty_scheduler(store.clone(), Fault::Delay(Duration::from_millis(300)));

    // The caller gives up long before runner B's lookups finish.
    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), scheduler.run_cycle_at(anchor())).await;
    assert!(cancelled.is_err());

    // The abandoned cycle is still running, so a timer tick must not start another.
    let tick = scheduler.run_cycle().await;
    assert!(tick.skipped);

    // The abandoned cycle still completes B's three rows.
    for _ in 0..200 {
        if store.statistics_count() == 9 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(store.statistics_count(), 9);
    assert_anchor_rows(&store, "B", 3).await;

    // A manual trigger waits for the lock, then runs normally.
    let report = scheduler.run_cycle_at(anchor()).await;
    assert!(!report.skipped);
    assert_eq!(report.succeeded, 3);
}
