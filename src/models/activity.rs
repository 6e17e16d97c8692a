// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw running activity record, owned by the record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::metabolic;

/// One run logged by a runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Store-assigned record ID (also used as document ID)
    pub id: String,
    /// Runner display name (not unique per record)
    pub runner_name: String,
    /// Run duration in whole minutes
    pub duration_minutes: u32,
    /// Distance in kilometers
    pub distance_km: f64,
    /// Cadence in steps per minute
    pub cadence: u32,
    /// Peak heart rate in bpm
    pub max_heart_rate: u32,
    /// Peak speed in km/h
    pub max_speed_kmh: f64,
    /// When the run happened
    pub recorded_at: DateTime<Utc>,
}

impl ActivityRecord {
    /// Average speed over the run in km/h (0.0 for a zero duration).
    pub fn average_speed_kmh(&self) -> f64 {
        metabolic::average_speed_kmh(self.duration_minutes, self.distance_km)
    }

    /// Average pace in minutes per km (0.0 for a zero distance).
    pub fn pace_min_per_km(&self) -> f64 {
        if self.distance_km <= 0.0 {
            return 0.0;
        }
        f64::from(self.duration_minutes) / self.distance_km
    }

    /// Estimated calories burned.
    pub fn calories(&self) -> f64 {
        metabolic::calories_for_activity(self.duration_minutes, self.distance_km)
    }

    /// Run time as `"1h 5m"` or `"45m"`.
    pub fn formatted_run_time(&self) -> String {
        format_minutes(self.duration_minutes)
    }

    /// Pace as `"m:ss/km"`.
    pub fn formatted_pace(&self) -> String {
        format_pace(self.pace_min_per_km())
    }

    /// Calories rounded to a whole number, e.g. `"342 cal"`.
    pub fn formatted_calories(&self) -> String {
        format!("{} cal", metabolic::round_half_up(self.calories(), 0) as u64)
    }
}

/// Format a minute count as hours and minutes.
pub fn format_minutes(total_minutes: u32) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Format a pace in minutes per km as `"m:ss/km"`, truncating seconds.
pub fn format_pace(min_per_km: f64) -> String {
    if !min_per_km.is_finite() || min_per_km <= 0.0 {
        return "0:00/km".to_string();
    }
    let minutes = min_per_km.trunc();
    let seconds = ((min_per_km - minutes) * 60.0) as u32;
    format!("{}:{:02}/km", minutes as u64, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_record(duration: u32, distance: f64) -> ActivityRecord {
        ActivityRecord {
            id: "r1".to_string(),
            runner_name: "A".to_string(),
            duration_minutes: duration,
            distance_km: distance,
            cadence: 170,
            max_heart_rate: 160,
            max_speed_kmh: 12.0,
            recorded_at: Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_zero_denominators_are_zero() {
        let record = make_record(0, 0.0);
        assert_eq!(record.average_speed_kmh(), 0.0);
        assert_eq!(record.pace_min_per_km(), 0.0);
        assert_eq!(record.calories(), 0.0);
        assert_eq!(record.formatted_pace(), "0:00/km");
    }

    #[test]
    fn test_formatted_run_time() {
        assert_eq!(make_record(0, 1.0).formatted_run_time(), "0m");
        assert_eq!(make_record(45, 1.0).formatted_run_time(), "45m");
        assert_eq!(make_record(65, 1.0).formatted_run_time(), "1h 5m");
    }

    #[test]
    fn test_formatted_pace() {
        // 33 minutes over 6 km = 5.5 min/km
        assert_eq!(make_record(33, 6.0).formatted_pace(), "5:30/km");
        assert_eq!(make_record(30, 5.0).formatted_pace(), "6:00/km");
    }

    #[test]
    fn test_formatted_calories() {
        // 341.8 rounds up to a whole number
        assert_eq!(make_record(30, 5.0).formatted_calories(), "342 cal");
        assert_eq!(make_record(60, 3.0).formatted_calories(), "441 cal");
        assert_eq!(make_record(0, 0.0).formatted_calories(), "0 cal");
    }

    #[test]
    fn test_serde_round_trip_keeps_timestamp() {
        let record = make_record(30, 5.0);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ActivityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
