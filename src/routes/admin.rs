// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Administrative triggers for on-demand statistics recompute.
//!
//! Protected by `require_admin_token` (see routes/mod.rs).

use crate::error::Result;
use crate::routes::api::StatisticsResponse;
use crate::services::CycleReport;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Admin routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/statistics/recompute", post(recompute_all))
        .route("/admin/statistics/recompute/{runner}", post(recompute_runner))
}

/// Recompute every runner now, using the scheduler's cycle logic.
///
/// Per-runner failures are reported in the body, never as an error status.
async fn recompute_all(State(state): State<Arc<AppState>>) -> Json<CycleReport> {
    Json(state.scheduler.run_cycle_now().await)
}

/// Recompute the current periods of a single runner.
///
/// Store failures propagate to the caller.
async fn recompute_runner(
    State(state): State<Arc<AppState>>,
    Path(runner): Path<String>,
) -> Result<Json<Vec<StatisticsResponse>>> {
    tracing::info!(runner = %runner, "Manual single-runner recompute");

    let rows = state
        .aggregator
        .recompute_current_periods(&runner, chrono::Utc::now())
        .await?;

    Ok(Json(rows.into_iter().map(StatisticsResponse::from).collect()))
}
