// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calorie estimate for a single run.
//!
//! Uses the MET (Metabolic Equivalent of Task) formula with a fixed
//! reference body mass, since no per-runner weight is tracked:
//!
//! `calories = minutes × MET × 3.5 × kg / 200`

const KMH_TO_MPH: f64 = 0.621371;
const REFERENCE_BODY_MASS_KG: f64 = 70.0;

/// MET used at or above the last breakpoint.
const TOP_MET: f64 = 23.0;

/// Running speed (mph, exclusive upper bound) → MET.
/// Values follow the Compendium of Physical Activities running entries.
const MET_TABLE: [(f64, f64); 16] = [
    (4.0, 6.0),
    (4.3, 6.5),
    (5.0, 7.8),
    (5.5, 8.5),
    (6.0, 9.0),
    (6.7, 9.3),
    (7.0, 10.5),
    (7.5, 11.0),
    (8.0, 11.5),
    (8.6, 12.3),
    (9.0, 12.8),
    (10.0, 14.5),
    (10.9, 15.3),
    (12.0, 16.0),
    (14.0, 19.0),
    (16.0, 19.8),
];

/// Look up the MET intensity for a running speed in mph.
pub fn met_for_speed_mph(speed_mph: f64) -> f64 {
    MET_TABLE
        .iter()
        .find(|(upper, _)| speed_mph < *upper)
        .map(|&(_, met)| met)
        .unwrap_or(TOP_MET)
}

/// Average speed in km/h; zero when either input is zero.
pub fn average_speed_kmh(duration_minutes: u32, distance_km: f64) -> f64 {
    if duration_minutes == 0 {
        return 0.0;
    }
    distance_km / f64::from(duration_minutes) * 60.0
}

/// Estimated calories burned for one run, rounded to one decimal.
///
/// Returns exactly `0.0` when the duration or the distance is zero.
pub fn calories_for_activity(duration_minutes: u32, distance_km: f64) -> f64 {
    if duration_minutes == 0 || distance_km <= 0.0 {
        return 0.0;
    }

    let speed_mph = average_speed_kmh(duration_minutes, distance_km) * KMH_TO_MPH;
    let met = met_for_speed_mph(speed_mph);
    let calories = f64::from(duration_minutes) * met * 3.5 * REFERENCE_BODY_MASS_KG / 200.0;

    round_half_up(calories, 1)
}

/// Round a non-negative value to `places` decimals, halves going up.
pub fn round_half_up(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor + 0.5).floor() / factor
}
