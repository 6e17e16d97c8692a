// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-runner statistics for one aggregation window.
//!
//! A row is a pure function of the activity records inside its window:
//! [`RunnerStatistics::recalculate`] rebuilds every aggregate from scratch,
//! so recomputing with the same records always yields the same values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::activity::{format_minutes, format_pace};
use crate::models::{ActivityRecord, PeriodKey, PeriodKind};
use crate::services::metabolic::round_half_up;

/// Aggregated statistics for a runner over one period.
///
/// Stored at: `runner_statistics/{runner}_{KIND}_{label}`
///
/// The period is kept as flat fields so stores can filter on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerStatistics {
    // ─── Identity ────────────────────────────────────────────────
    pub runner_name: String,
    pub period_kind: PeriodKind,
    /// ISO week-based year for weekly rows, calendar year otherwise
    pub period_year: i32,
    /// Set for weekly rows only
    #[serde(default)]
    pub period_week: Option<u32>,
    /// Set for monthly rows only
    #[serde(default)]
    pub period_month: Option<u32>,

    // ─── Totals ──────────────────────────────────────────────────
    #[serde(default)]
    pub total_runs: u32,
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub total_time_minutes: u32,
    #[serde(default)]
    pub total_calories: f64,

    // ─── Derived ─────────────────────────────────────────────────
    #[serde(default)]
    pub average_speed_kmh: f64,
    #[serde(default)]
    pub average_pace_min_per_km: f64,
    #[serde(default)]
    pub average_heart_rate: u32,
    #[serde(default)]
    pub average_cadence: u32,
    #[serde(default)]
    pub max_speed_kmh: f64,
    #[serde(default)]
    pub max_distance_km: f64,
    #[serde(default)]
    pub max_time_minutes: u32,

    // ─── Metadata ────────────────────────────────────────────────
    /// When the aggregates were last recomputed
    pub last_calculated_at: DateTime<Utc>,
    /// When the row was first created
    pub created_at: DateTime<Utc>,
}

impl RunnerStatistics {
    /// Fresh zero-valued row for a runner and period.
    pub fn new(runner_name: &str, key: PeriodKey, now: DateTime<Utc>) -> Self {
        Self {
            runner_name: runner_name.to_string(),
            period_kind: key.kind(),
            period_year: key.year(),
            period_week: key.week(),
            period_month: key.month(),
            total_runs: 0,
            total_distance_km: 0.0,
            total_time_minutes: 0,
            total_calories: 0.0,
            average_speed_kmh: 0.0,
            average_pace_min_per_km: 0.0,
            average_heart_rate: 0,
            average_cadence: 0,
            max_speed_kmh: 0.0,
            max_distance_km: 0.0,
            max_time_minutes: 0,
            last_calculated_at: now,
            created_at: now,
        }
    }

    /// Reassemble the period key from the flat fields.
    ///
    /// Returns `None` when the stored fields do not describe a valid key.
    pub fn period_key(&self) -> Option<PeriodKey> {
        let key = match self.period_kind {
            PeriodKind::Weekly => PeriodKey::Weekly {
                year: self.period_year,
                week: self.period_week?,
            },
            PeriodKind::Monthly => PeriodKey::Monthly {
                year: self.period_year,
                month: self.period_month?,
            },
            PeriodKind::Yearly => PeriodKey::Yearly {
                year: self.period_year,
            },
        };
        Some(key)
    }

    /// Rebuild every aggregate from `records` and stamp `now`.
    ///
    /// An empty slice zeroes the row, overwriting stale values.
    pub fn recalculate(&mut self, records: &[ActivityRecord], now: DateTime<Utc>) {
        self.last_calculated_at = now;

        if records.is_empty() {
            self.reset_aggregates();
            return;
        }

        let count = records.len() as f64;
        let total_distance: f64 = records.iter().map(|r| r.distance_km).sum();
        let total_time: u32 = records.iter().map(|r| r.duration_minutes).sum();
        let total_calories: f64 = records.iter().map(ActivityRecord::calories).sum();

        self.total_runs = records.len() as u32;
        self.total_distance_km = round_half_up(total_distance, 2);
        self.total_time_minutes = total_time;
        self.total_calories = round_half_up(total_calories, 1);

        let average_speed = if total_time > 0 {
            total_distance / f64::from(total_time) * 60.0
        } else {
            0.0
        };
        self.average_speed_kmh = round_half_up(average_speed, 2);

        let average_pace = if total_distance > 0.0 {
            f64::from(total_time) / total_distance
        } else {
            0.0
        };
        self.average_pace_min_per_km = round_half_up(average_pace, 2);

        let heart_rate_sum: f64 = records.iter().map(|r| f64::from(r.max_heart_rate)).sum();
        self.average_heart_rate = round_half_up(heart_rate_sum / count, 0) as u32;

        let cadence_sum: f64 = records.iter().map(|r| f64::from(r.cadence)).sum();
        self.average_cadence = round_half_up(cadence_sum / count, 0) as u32;

        let max_speed = records.iter().map(|r| r.max_speed_kmh).fold(0.0, f64::max);
        self.max_speed_kmh = round_half_up(max_speed, 2);

        let max_distance = records.iter().map(|r| r.distance_km).fold(0.0, f64::max);
        self.max_distance_km = round_half_up(max_distance, 2);

        self.max_time_minutes = records
            .iter()
            .map(|r| r.duration_minutes)
            .max()
            .unwrap_or(0);
    }

    /// True when every aggregate equals `other`'s, ignoring timestamps.
    pub fn same_aggregates(&self, other: &RunnerStatistics) -> bool {
        let mut a = self.clone();
        a.last_calculated_at = other.last_calculated_at;
        a.created_at = other.created_at;
        a == *other
    }

    fn reset_aggregates(&mut self) {
        self.total_runs = 0;
        self.total_distance_km = 0.0;
        self.total_time_minutes = 0;
        self.total_calories = 0.0;
        self.average_speed_kmh = 0.0;
        self.average_pace_min_per_km = 0.0;
        self.average_heart_rate = 0;
        self.average_cadence = 0;
        self.max_speed_kmh = 0.0;
        self.max_distance_km = 0.0;
        self.max_time_minutes = 0;
    }

    pub fn formatted_total_time(&self) -> String {
        format_minutes(self.total_time_minutes)
    }

    pub fn formatted_average_pace(&self) -> String {
        format_pace(self.average_pace_min_per_km)
    }

    /// Human-readable period, e.g. `"2025 week 3"`.
    pub fn period_display(&self) -> String {
        self.period_key()
            .map(|key| key.to_string())
            .unwrap_or_default()
    }
}
