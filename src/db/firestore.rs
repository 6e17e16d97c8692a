// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the store contracts.
//!
//! Provides:
//! - Activity records (read-only: runner listing and period queries)
//! - Runner statistics (keyed upsert, lookups, rankings)

use crate::db::{
    collections, sort_by_distance, sort_newest_first, statistics_doc_id, ActivityRecordStore,
    StatisticsStore,
};
use crate::error::AppError;
use crate::models::{ActivityRecord, PeriodKey, PeriodKind, RunnerStatistics};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Activity record as stored in Firestore.
///
/// `recorded_at` is a native Firestore timestamp so period range filters
/// compare chronologically.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredActivityRecord {
    id: String,
    runner_name: String,
    duration_minutes: u32,
    distance_km: f64,
    cadence: u32,
    max_heart_rate: u32,
    max_speed_kmh: f64,
    #[serde(with = "firestore::serialize_as_timestamp")]
    recorded_at: DateTime<Utc>,
}

impl From<StoredActivityRecord> for ActivityRecord {
    fn from(stored: StoredActivityRecord) -> Self {
        Self {
            id: stored.id,
            runner_name: stored.runner_name,
            duration_minutes: stored.duration_minutes,
            distance_km: stored.distance_km,
            cadence: stored.cadence,
            max_heart_rate: stored.max_heart_rate,
            max_speed_kmh: stored.max_speed_kmh,
            recorded_at: stored.recorded_at,
        }
    }
}

impl From<&ActivityRecord> for StoredActivityRecord {
    fn from(record: &ActivityRecord) -> Self {
        Self {
            id: record.id.clone(),
            runner_name: record.runner_name.clone(),
            duration_minutes: record.duration_minutes,
            distance_km: record.distance_km,
            cadence: record.cadence,
            max_heart_rate: record.max_heart_rate,
            max_speed_kmh: record.max_speed_kmh,
            recorded_at: record.recorded_at,
        }
    }
}

/// Projection used when only runner names are needed.
#[derive(Debug, Deserialize)]
struct RunnerNameOnly {
    runner_name: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return `StoreUnavailable`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StoreUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    // ─── Activity Record Seeding ───────────────────────────────────

    /// Store an activity record. Records are normally written by the
    /// owning application; this exists for seeding and emulator tests.
    pub async fn set_activity_record(&self, record: &ActivityRecord) -> Result<(), AppError> {
        let stored = StoredActivityRecord::from(record);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITY_RECORDS)
            .document_id(&record.id)
            .object(&stored)
            .execute()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ActivityRecordStore for FirestoreDb {
    /// Firestore has no distinct query, so this projects `runner_name` out
    /// of every document in `activity_records`. Reads scale with the total
    /// record count and are paid once per cycle.
    async fn list_distinct_runners(&self) -> Result<BTreeSet<String>, AppError> {
        let rows: Vec<RunnerNameOnly> = self
            .get_client()?
            .fluent()
            .select()
            .fields(["runner_name"])
            .from(collections::ACTIVITY_RECORDS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        Ok(rows.into_iter().map(|row| row.runner_name).collect())
    }

    /// Requires the composite index
    /// `activity_records(runner_name ASC, recorded_at DESC)`.
    async fn find_records(
        &self,
        runner: &str,
        key: &PeriodKey,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        let (start, end) = key.bounds()?;
        let runner = runner.to_string();

        let stored: Vec<StoredActivityRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITY_RECORDS)
            .filter(move |q| {
                q.for_all([
                    q.field("runner_name").eq(runner.clone()),
                    q.field("recorded_at")
                        .greater_than_or_equal(firestore::FirestoreTimestamp(start)),
                    q.field("recorded_at")
                        .less_than(firestore::FirestoreTimestamp(end)),
                ])
            })
            .order_by([(
                "recorded_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        Ok(stored.into_iter().map(ActivityRecord::from).collect())
    }
}

#[async_trait]
impl StatisticsStore for FirestoreDb {
    async fn find_statistics(
        &self,
        runner: &str,
        key: &PeriodKey,
    ) -> Result<Option<RunnerStatistics>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RUNNER_STATISTICS)
            .obj()
            .one(&statistics_doc_id(runner, key))
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
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

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RUNNER_STATISTICS)
            .document_id(statistics_doc_id(&stats.runner_name, &key))
            .object(&stats)
            .execute()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        Ok(stats)
    }

    async fn list_for_runner(
        &self,
        runner: &str,
        kind: Option<PeriodKind>,
    ) -> Result<Vec<RunnerStatistics>, AppError> {
        let runner = runner.to_string();

        // Per-runner lists are small; ordering is done in memory so rows
        // with null week/month fields are not dropped by Firestore.
        let mut rows: Vec<RunnerStatistics> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::RUNNER_STATISTICS)
            .filter(move |q| {
                q.for_all([
                    q.field("runner_name").eq(runner.clone()),
                    kind.and_then(|k| q.field("period_kind").eq(k.as_str())),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        sort_newest_first(&mut rows);
        Ok(rows)
    }

    /// Requires composite indexes on `runner_statistics` over
    /// `period_kind, period_year, total_distance_km DESC`, with
    /// `period_week` (weekly) or `period_month` (monthly) after the year.
    async fn top_runners(
        &self,
        key: &PeriodKey,
        limit: usize,
    ) -> Result<Vec<RunnerStatistics>, AppError> {
        key.validate()?;
        let key = *key;

        let mut rows: Vec<RunnerStatistics> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::RUNNER_STATISTICS)
            .filter(move |q| {
                q.for_all([
                    q.field("period_kind").eq(key.kind().as_str()),
                    q.field("period_year").eq(i64::from(key.year())),
                    key.week()
                        .and_then(|w| q.field("period_week").eq(i64::from(w))),
                    key.month()
                        .and_then(|m| q.field("period_month").eq(i64::from(m))),
                ])
            })
            .order_by([(
                "total_distance_km",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(u32::try_from(limit).unwrap_or(u32::MAX))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        // Firestore breaks distance ties arbitrarily; make them stable.
        sort_by_distance(&mut rows);
        Ok(rows)
    }

    async fn list_runner_names(&self) -> Result<Vec<String>, AppError> {
        let rows: Vec<RunnerNameOnly> = self
            .get_client()?
            .fluent()
            .select()
            .fields(["runner_name"])
            .from(collections::RUNNER_STATISTICS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        let names: BTreeSet<String> = rows.into_iter().map(|row| row.runner_name).collect();
        Ok(names.into_iter().collect())
    }
}
