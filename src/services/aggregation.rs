// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Statistics aggregation service.
//!
//! Recomputes one (runner, period) row at a time:
//! 1. Resolve the period key from a reference instant
//! 2. Fetch the runner's records inside that period
//! 3. Load the existing row (or start a zero row)
//! 4. Rebuild every aggregate from the records
//! 5. Upsert the row
//!
//! Steps 2-5 run under a per-row lock so two recomputes of the same row
//! never interleave their read and write.

use crate::db::{statistics_doc_id, ActivityRecordStore, StatisticsStore};
use crate::error::Result;
use crate::models::{PeriodKey, PeriodKind, RunnerStatistics};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-row mutexes keyed by statistics document id.
pub type RowLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Rebuilds runner statistics from activity records.
pub struct StatisticsAggregator {
    records: Arc<dyn ActivityRecordStore>,
    statistics: Arc<dyn StatisticsStore>,
    row_locks: RowLocks,
}

impl StatisticsAggregator {
    pub fn new(records: Arc<dyn ActivityRecordStore>, statistics: Arc<dyn StatisticsStore>) -> Self {
        Self {
            records,
            statistics,
            row_locks: Arc::new(DashMap::new()),
        }
    }

    /// Record store this aggregator reads from.
    pub fn records(&self) -> &Arc<dyn ActivityRecordStore> {
        &self.records
    }

    /// Recompute the `kind` row containing `reference` for `runner`.
    pub async fn recompute(
        &self,
        runner: &str,
        kind: PeriodKind,
        reference: DateTime<Utc>,
    ) -> Result<RunnerStatistics> {
        let key = PeriodKey::resolve(kind, reference);
        self.recompute_key(runner, key).await
    }

    /// Recompute the row for an explicit period key.
    pub async fn recompute_key(&self, runner: &str, key: PeriodKey) -> Result<RunnerStatistics> {
        key.validate()?;

        let lock_id = statistics_doc_id(runner, &key);
        let lock = self
            .row_locks
            .entry(lock_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.recompute_locked(runner, key).await
        };

        // Drop the entry once nobody else holds or waits on it.
        drop(lock);
        self.row_locks
            .remove_if(&lock_id, |_, entry| Arc::strong_count(entry) == 1);

        result
    }

    async fn recompute_locked(&self, runner: &str, key: PeriodKey) -> Result<RunnerStatistics> {
        let records = self.records.find_records(runner, &key).await?;
        let now = Utc::now();

        let mut stats = self
            .statistics
            .find_statistics(runner, &key)
            .await?
            .unwrap_or_else(|| RunnerStatistics::new(runner, key, now));

        stats.recalculate(&records, now);
        let stats = self.statistics.upsert_statistics(stats).await?;

        tracing::debug!(
            runner,
            period = %key.label(),
            kind = %key.kind(),
            runs = stats.total_runs,
            distance_km = stats.total_distance_km,
            "Statistics recomputed"
        );

        Ok(stats)
    }

    /// Recompute the current week, month and year for one runner.
    ///
    /// Stops at the first failure and returns it to the caller.
    pub async fn recompute_current_periods(
        &self,
        runner: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<RunnerStatistics>> {
        let mut rows = Vec::with_capacity(PeriodKind::ALL.len());
        for kind in PeriodKind::ALL {
            rows.push(self.recompute(runner, kind, now).await?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::ActivityRecord;
    use chrono::TimeZone;

    fn record(id: &str, runner: &str, at: DateTime<Utc>, duration: u32, distance: f64) -> ActivityRecord {
        ActivityRecord {
            id: id.to_string(),
            runner_name: runner.to_string(),
            duration_minutes: duration,
            distance_km: distance,
            cadence: 170,
            max_heart_rate: 160,
            max_speed_kmh: 14.0,
            recorded_at: at,
        }
    }

    fn setup() -> (Arc<MemoryStore>, StatisticsAggregator) {
        let store = Arc::new(MemoryStore::new());
        let aggregator = StatisticsAggregator::new(store.clone(), store.clone());
        (store, aggregator)
    }

    fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 12, 18, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_weekly_scenario() {
        let (store, aggregator) = setup();
        store.insert_record(record("1", "A", wednesday() - chrono::Duration::days(1), 30, 5.0));
        store.insert_record(record("2", "A", wednesday(), 60, 10.0));

        let stats = aggregator
            .recompute("A", PeriodKind::Weekly, wednesday())
            .await
            .unwrap();

        assert_eq!(stats.period_key(), Some(PeriodKey::Weekly { year: 2025, week: 11 }));
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.total_distance_km, 15.0);
        assert_eq!(stats.total_time_minutes, 90);
        assert_eq!(stats.average_speed_kmh, 10.0);
        assert_eq!(stats.average_pace_min_per_km, 6.0);
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent_and_keeps_created_at() {
        let (store, aggregator) = setup();
        store.insert_record(record("1", "A", wednesday(), 42, 7.3));

        let first = aggregator
            .recompute("A", PeriodKind::Monthly, wednesday())
            .await
            .unwrap();
        let second = aggregator
            .recompute("A", PeriodKind::Monthly, wednesday())
            .await
            .unwrap();

        assert!(first.same_aggregates(&second));
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.statistics_count(), 1);
    }

    #[tokio::test]
    async fn test_no_records_zeroes_existing_row() {
        let (store, aggregator) = setup();
        store.insert_record(record("1", "A", wednesday(), 30, 5.0));
        let before = aggregator
            .recompute("A", PeriodKind::Yearly, wednesday())
            .await
            .unwrap();
        assert_eq!(before.total_runs, 1);

        store.remove_record("A", "1");
        let after = aggregator
            .recompute("A", PeriodKind::Yearly, wednesday())
            .await
            .unwrap();

        assert_eq!(after.total_runs, 0);
        assert_eq!(after.total_distance_km, 0.0);
        assert_eq!(after.total_calories, 0.0);
        assert_eq!(after.max_time_minutes, 0);
    }

    #[tokio::test]
    async fn test_dec_31_lands_in_week_1_of_next_year() {
        let (store, aggregator) = setup();
        let dec_31 = Utc.with_ymd_and_hms(2024, 12, 31, 9, 0, 0).unwrap();
        store.insert_record(record("1", "A", dec_31, 30, 5.0));

        let reference = Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap();
        let weekly = aggregator
            .recompute("A", PeriodKind::Weekly, reference)
            .await
            .unwrap();
        assert_eq!(weekly.period_key(), Some(PeriodKey::Weekly { year: 2025, week: 1 }));
        assert_eq!(weekly.total_runs, 1);

        // The calendar year 2025 does not contain Dec 31 2024.
        let yearly = aggregator
            .recompute("A", PeriodKind::Yearly, reference)
            .await
            .unwrap();
        assert_eq!(yearly.total_runs, 0);
    }

    #[tokio::test]
    async fn test_current_periods_produce_three_rows() {
        let (store, aggregator) = setup();
        store.insert_record(record("1", "A", wednesday(), 30, 5.0));

        let rows = aggregator
            .recompute_current_periods("A", wednesday())
            .await
            .unwrap();

        let kinds: Vec<PeriodKind> = rows.iter().map(|r| r.period_kind).collect();
        assert_eq!(kinds, PeriodKind::ALL.to_vec());
        assert!(rows.iter().all(|r| r.total_runs == 1));
    }

    #[tokio::test]
    async fn test_concurrent_recomputes_of_same_row_leave_one_row() {
        let (store, aggregator) = setup();
        for i in 0..5 {
            store.insert_record(record(&i.to_string(), "A", wednesday(), 20, 3.0));
        }
        let aggregator = Arc::new(aggregator);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let aggregator = aggregator.clone();
                tokio::spawn(async move {
                    aggregator
                        .recompute("A", PeriodKind::Weekly, wednesday())
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.statistics_count(), 1);
        let key = PeriodKey::Weekly {
            year: 2025,
            week: 11,
        };
        let row = store.find_statistics("A", &key).await.unwrap().unwrap();
        assert_eq!(row.total_runs, 5);
        assert_eq!(row.total_distance_km, 15.0);
        assert!(aggregator.row_locks.is_empty());
    }

    #[tokio::test]
    async fn test_row_locks_released_after_recompute() {
        let (store, aggregator) = setup();
        store.insert_record(record("1", "A", wednesday(), 30, 5.0));

        aggregator
            .recompute_current_periods("A", wednesday())
            .await
            .unwrap();
        assert!(aggregator.row_locks.is_empty());

        // Failed recomputes release their entry too.
        let offline = Arc::new(crate::db::FirestoreDb::new_mock());
        let failing = StatisticsAggregator::new(offline.clone(), offline);
        assert!(failing
            .recompute("A", PeriodKind::Weekly, wednesday())
            .await
            .is_err());
        assert!(failing.row_locks.is_empty());
    }
}
