// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runner-Stats: periodic running statistics for a runners' community.
//!
//! This crate scans raw activity records per runner and keeps rolling
//! weekly, monthly and yearly summaries (including a calorie estimate)
//! up to date, and serves them over a small HTTP API.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{ActivityRecordStore, StatisticsStore};
use services::{StatisticsAggregator, StatisticsScheduler};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub records: Arc<dyn ActivityRecordStore>,
    pub statistics: Arc<dyn StatisticsStore>,
    pub aggregator: Arc<StatisticsAggregator>,
    pub scheduler: Arc<StatisticsScheduler>,
}

impl AppState {
    /// Wire the aggregation services on top of the given stores.
    ///
    /// The scheduler is created stopped; call `scheduler.start()` on boot.
    pub fn new(
        config: Config,
        records: Arc<dyn ActivityRecordStore>,
        statistics: Arc<dyn StatisticsStore>,
    ) -> Self {
        let aggregator = Arc::new(StatisticsAggregator::new(
            records.clone(),
            statistics.clone(),
        ));
        let scheduler = Arc::new(StatisticsScheduler::new(
            aggregator.clone(),
            config.stats_interval,
            config.stats_max_concurrency,
        ));

        Self {
            config,
            records,
            statistics,
            aggregator,
            scheduler,
        }
    }
}
