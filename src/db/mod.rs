// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer: collaborator contracts and their backends.
//!
//! The aggregation core only talks to the two traits below. `MemoryStore`
//! backs local development and tests; `FirestoreDb` backs production.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{ActivityRecord, PeriodKey, PeriodKind, RunnerStatistics};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITY_RECORDS: &str = "activity_records";
    /// Runner statistics rows (keyed by runner, kind and period label)
    pub const RUNNER_STATISTICS: &str = "runner_statistics";
}

/// Read access to raw activity records.
#[async_trait]
pub trait ActivityRecordStore: Send + Sync {
    /// Every runner that has at least one record.
    async fn list_distinct_runners(&self) -> Result<BTreeSet<String>, AppError>;

    /// Records of `runner` that fall inside `key`'s window.
    async fn find_records(
        &self,
        runner: &str,
        key: &PeriodKey,
    ) -> Result<Vec<ActivityRecord>, AppError>;
}

/// Keyed storage for runner statistics rows.
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    async fn find_statistics(
        &self,
        runner: &str,
        key: &PeriodKey,
    ) -> Result<Option<RunnerStatistics>, AppError>;

    /// Insert or fully replace the row keyed by the statistics' runner and period.
    async fn upsert_statistics(
        &self,
        stats: RunnerStatistics,
    ) -> Result<RunnerStatistics, AppError>;

    /// Rows for a runner, newest period first.
    async fn list_for_runner(
        &self,
        runner: &str,
        kind: Option<PeriodKind>,
    ) -> Result<Vec<RunnerStatistics>, AppError>;

    /// Rows for one period ranked by total distance, longest first.
    async fn top_runners(
        &self,
        key: &PeriodKey,
        limit: usize,
    ) -> Result<Vec<RunnerStatistics>, AppError>;

    /// Sorted names of runners that have statistics.
    async fn list_runner_names(&self) -> Result<Vec<String>, AppError>;
}

/// Unique document id for a (runner, period) row.
pub fn statistics_doc_id(runner: &str, key: &PeriodKey) -> String {
    format!(
        "{}_{}_{}",
        urlencoding::encode(runner),
        key.kind(),
        key.label()
    )
}

/// Newest period first: year, then week, then month, all descending.
pub(crate) fn sort_newest_first(rows: &mut [RunnerStatistics]) {
    rows.sort_by(|a, b| {
        b.period_year
            .cmp(&a.period_year)
            .then_with(|| b.period_week.cmp(&a.period_week))
            .then_with(|| b.period_month.cmp(&a.period_month))
            .then_with(|| a.period_kind.cmp(&b.period_kind))
    });
}

/// Longest total distance first, ties broken by name.
pub(crate) fn sort_by_distance(rows: &mut [RunnerStatistics]) {
    rows.sort_by(|a, b| {
        b.total_distance_km
            .total_cmp(&a.total_distance_km)
            .then_with(|| a.runner_name.cmp(&b.runner_name))
    });
}
