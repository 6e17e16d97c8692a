// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod period;
pub mod stats;

pub use activity::ActivityRecord;
pub use period::{PeriodKey, PeriodKind};
pub use stats::RunnerStatistics;
