// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use runner_stats::config::Config;
use runner_stats::db::{ActivityRecordStore, FirestoreDb, MemoryStore, StatisticsStore};
use runner_stats::error::AppError;
use runner_stats::models::{ActivityRecord, PeriodKey};
use runner_stats::routes::create_router;
use runner_stats::AppState;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Fixed cycle anchor: Wednesday of ISO week 2025-W11.
#[allow(dead_code)]
pub fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap()
}

/// Build an activity record.
#[allow(dead_code)]
pub fn record(
    id: &str,
    runner: &str,
    recorded_at: DateTime<Utc>,
    duration_minutes: u32,
    distance_km: f64,
) -> ActivityRecord {
    ActivityRecord {
        id: id.to_string(),
        runner_name: runner.to_string(),
        duration_minutes,
        distance_km,
        cadence: 170,
        max_heart_rate: 150,
        max_speed_kmh: 12.0,
        recorded_at,
    }
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router, the shared state and the store for seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(
    config: Config,
) -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config, store.clone(), store.clone()));
    (create_router(state.clone()), state, store)
}

/// How [`FaultyRecordStore`] misbehaves for its target runner.
#[allow(dead_code)]
#[derive(Clone, Copy)]
pub enum Fault {
    Error,
    Panic,
    /// Answer correctly, but only after sleeping.
    Delay(Duration),
}

/// Record store that delegates to a [`MemoryStore`] but misbehaves on
/// every record lookup for one runner.
#[allow(dead_code)]
pub struct FaultyRecordStore {
    pub inner: Arc<MemoryStore>,
    pub runner: String,
    pub fault: Fault,
}

#[async_trait]
impl ActivityRecordStore for FaultyRecordStore {
    async fn list_distinct_runners(&self) -> Result<BTreeSet<String>, AppError> {
        self.inner.list_distinct_runners().await
    }

    async fn find_records(
        &self,
        runner: &str,
        key: &PeriodKey,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        if runner == self.runner {
            match self.fault {
                Fault::Error => {
                    return Err(AppError::StoreUnavailable(format!(
                        "injected failure for {}",
                        runner
                    )))
                }
                Fault::Panic => panic!("injected panic for {}", runner),
                Fault::Delay(delay) => tokio::time::sleep(delay).await,
            }
        }
        self.inner.find_records(runner, key).await
    }
}

/// Statistics store whose every call fails.
#[allow(dead_code)]
pub fn offline_statistics() -> Arc<dyn StatisticsStore> {
    Arc::new(FirestoreDb::new_mock())
}
