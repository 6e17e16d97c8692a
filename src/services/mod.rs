// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregation;
pub mod metabolic;
pub mod scheduler;

pub use aggregation::StatisticsAggregator;
pub use metabolic::calories_for_activity;
pub use scheduler::{CycleReport, StatisticsScheduler};
