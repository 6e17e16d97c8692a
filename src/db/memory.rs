// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by concurrent maps.
//!
//! Implements both collaborator traits. Records are grouped by runner;
//! statistics rows are keyed by [`statistics_doc_id`].

use crate::db::{
    sort_by_distance, sort_newest_first, statistics_doc_id, ActivityRecordStore, StatisticsStore,
};
use crate::error::AppError;
use crate::models::{ActivityRecord, PeriodKey, PeriodKind, RunnerStatistics};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;

#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, Vec<ActivityRecord>>,
    statistics: DashMap<String, RunnerStatistics>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace (by id) an activity record.
    pub fn insert_record(&self, record: ActivityRecord) {
        let mut entry = self.records.entry(record.runner_name.clone()).or_default();
        entry.retain(|r| r.id != record.id);
        entry.push(record);
    }

    /// Remove a record by id. Returns whether it existed.
    pub fn remove_record(&self, runner: &str, id: &str) -> bool {
        let removed = match self.records.get_mut(runner) {
            Some(mut records) => {
                let before = records.len();
                records.retain(|r| r.id != id);
                records.len() != before
            }
            None => false,
        };
        self.records.remove_if(runner, |_, records| records.is_empty());
        removed
    }

    /// Number of statistics rows held.
    pub fn statistics_count(&self) -> usize {
        self.statistics.len()
    }
}

#[async_trait]
impl ActivityRecordStore for MemoryStore {
    async fn list_distinct_runners(&self) -> Result<BTreeSet<String>, AppError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn find_records(
        &self,
        runner: &str,
        key: &PeriodKey,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        key.validate()?;
        let mut records: Vec<ActivityRecord> = self
            .records
            .get(runner)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| key.contains(r.recorded_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(records)
    }
}

#[async_trait]
impl StatisticsStore for MemoryStore {
    async fn find_statistics(
        &self,
        runner: &str,
        key: &PeriodKey,
    ) -> Result<Option<RunnerStatistics>, AppError> {
        Ok(self
            .statistics
            .get(&statistics_doc_id(runner, key))
            .map(|row| row.clone()))
    }

    async fn upsert_statistics(
        &self,
        stats: RunnerStatistics,
    ) -> Result<RunnerStatistics, AppError> {
        let key = stats.period_key().ok_or_else(|| {
            AppError::InvalidPeriod(format!(
                "statistics row for {} has incomplete period fields",
                stats.runner_name
            ))
        })?;
        self.statistics
            .insert(statistics_doc_id(&stats.runner_name, &key), stats.clone());
        Ok(stats)
    }

    async fn list_for_runner(
        &self,
        runner: &str,
        kind: Option<PeriodKind>,
    ) -> Result<Vec<RunnerStatistics>, AppError> {
        let mut rows: Vec<RunnerStatistics> = self
            .statistics
            .iter()
            .filter(|row| row.runner_name == runner)
            .filter(|row| kind.map_or(true, |k| row.period_kind == k))
            .map(|row| row.clone())
            .collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    async fn top_runners(
        &self,
        key: &PeriodKey,
        limit: usize,
    ) -> Result<Vec<RunnerStatistics>, AppError> {
        let mut rows: Vec<RunnerStatistics> = self
            .statistics
            .iter()
            .filter(|row| row.period_key().as_ref() == Some(key))
            .map(|row| row.clone())
            .collect();
        sort_by_distance(&mut rows);
        rows.truncate(limit);
        Ok(rows)
    }

    async fn list_runner_names(&self) -> Result<Vec<String>, AppError> {
        let names: BTreeSet<String> = self
            .statistics
            .iter()
            .map(|row| row.runner_name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }
}
