// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only statistics API.

use crate::error::{AppError, Result};
use crate::models::{PeriodKey, PeriodKind, RunnerStatistics};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Public statistics routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/runners", get(list_runners))
        .route("/api/stats/{runner}", get(get_runner_stats))
        .route("/api/leaderboard", get(get_leaderboard))
}

/// One statistics row as returned by the API.
#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatisticsResponse {
    pub runner_name: String,
    pub period_kind: PeriodKind,
    /// e.g. "2025-W03", "2025-03", "2025"
    pub period: String,
    pub period_display: String,
    pub total_runs: u32,
    pub total_distance_km: f64,
    pub total_time_minutes: u32,
    pub total_time_display: String,
    pub total_calories: f64,
    pub average_speed_kmh: f64,
    pub average_pace_min_per_km: f64,
    pub average_pace_display: String,
    pub average_heart_rate: u32,
    pub average_cadence: u32,
    pub max_speed_kmh: f64,
    pub max_distance_km: f64,
    pub max_time_minutes: u32,
    pub last_calculated_at: String,
}

impl From<RunnerStatistics> for StatisticsResponse {
    fn from(stats: RunnerStatistics) -> Self {
        Self {
            period: stats.period_key().map(|k| k.label()).unwrap_or_default(),
            period_display: stats.period_display(),
            total_time_display: stats.formatted_total_time(),
            average_pace_display: stats.formatted_average_pace(),
            last_calculated_at: format_utc_rfc3339(stats.last_calculated_at),
            runner_name: stats.runner_name,
            period_kind: stats.period_kind,
            total_runs: stats.total_runs,
            total_distance_km: stats.total_distance_km,
            total_time_minutes: stats.total_time_minutes,
            total_calories: stats.total_calories,
            average_speed_kmh: stats.average_speed_kmh,
            average_pace_min_per_km: stats.average_pace_min_per_km,
            average_heart_rate: stats.average_heart_rate,
            average_cadence: stats.average_cadence,
            max_speed_kmh: stats.max_speed_kmh,
            max_distance_km: stats.max_distance_km,
            max_time_minutes: stats.max_time_minutes,
        }
    }
}

// ─── Runners ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RunnersResponse {
    pub runners: Vec<String>,
}

/// Names of runners that have statistics.
async fn list_runners(State(state): State<Arc<AppState>>) -> Result<Json<RunnersResponse>> {
    let runners = state.statistics.list_runner_names().await?;
    Ok(Json(RunnersResponse { runners }))
}

// ─── Runner Statistics ───────────────────────────────────────

#[derive(Deserialize)]
struct RunnerStatsQuery {
    /// Filter by period kind (weekly, monthly, yearly)
    period: Option<String>,
}

/// Statistics rows for one runner, newest first. Empty when none exist.
async fn get_runner_stats(
    State(state): State<Arc<AppState>>,
    Path(runner): Path<String>,
    Query(params): Query<RunnerStatsQuery>,
) -> Result<Json<Vec<StatisticsResponse>>> {
    let kind = params
        .period
        .as_deref()
        .map(str::parse::<PeriodKind>)
        .transpose()?;

    tracing::debug!(runner = %runner, period = ?kind, "Fetching runner statistics");

    let rows = state.statistics.list_for_runner(&runner, kind).await?;
    Ok(Json(rows.into_iter().map(StatisticsResponse::from).collect()))
}

// ─── Leaderboard ─────────────────────────────────────────────

#[derive(Deserialize)]
struct LeaderboardQuery {
    period: String,
    year: Option<i32>,
    month: Option<u32>,
    week: Option<u32>,
    limit: Option<usize>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardResponse {
    pub period_kind: PeriodKind,
    pub period: String,
    pub entries: Vec<StatisticsResponse>,
}

/// Fill unspecified key parts from the current period.
fn leaderboard_key(params: &LeaderboardQuery) -> Result<PeriodKey> {
    let kind: PeriodKind = params.period.parse()?;
    let current = PeriodKey::resolve(kind, chrono::Utc::now());

    if params.year.is_none() && params.month.is_none() && params.week.is_none() {
        return Ok(current);
    }

    let year = params.year.unwrap_or_else(|| current.year());
    PeriodKey::from_parts(
        kind,
        year,
        params.month.or(current.month()),
        params.week.or(current.week()),
    )
}

/// Runners ranked by total distance for one period.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>> {
    let key = leaderboard_key(&params)?;
    let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    if limit == 0 {
        return Err(AppError::BadRequest(
            "limit must be greater than 0".to_string(),
        ));
    }
    let limit = limit.min(MAX_LEADERBOARD_LIMIT);

    tracing::debug!(period = %key.label(), limit, "Fetching leaderboard");

    let rows = state.statistics.top_runners(&key, limit).await?;

    Ok(Json(LeaderboardResponse {
        period_kind: key.kind(),
        period: key.label(),
        entries: rows.into_iter().map(StatisticsResponse::from).collect(),
    }))
}
