// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic statistics recompute.
//!
//! A single background task ticks on a fixed interval and runs a cycle:
//! list every runner, then recompute the current week, month and year for
//! each of them on a bounded pool. One runner failing (error or panic) is
//! logged and never stops the others.
//!
//! At most one cycle runs at a time. A timer tick that finds a cycle in
//! flight is skipped; a manual trigger waits for it and then runs.

use crate::services::StatisticsAggregator;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Outcome of one scheduler cycle.
#[derive(Debug, Clone, Default, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CycleReport {
    /// Runners found in the record store.
    pub runners: u32,
    /// Runners whose three rows were all upserted.
    pub succeeded: u32,
    /// Runners that failed, sorted by name.
    pub failed: Vec<String>,
    /// True when the runner list itself could not be read.
    pub listing_failed: bool,
    /// True when the tick was dropped because a cycle was already running.
    pub skipped: bool,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Handle of the running timer task.
struct TimerTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives [`StatisticsAggregator`] over all runners on an interval.
pub struct StatisticsScheduler {
    aggregator: Arc<StatisticsAggregator>,
    interval: Duration,
    max_concurrency: usize,
    /// Owned by the task running a cycle, for the whole duration of it.
    cycle_lock: Arc<Mutex<()>>,
    timer: std::sync::Mutex<Option<TimerTask>>,
}

impl StatisticsScheduler {
    pub fn new(
        aggregator: Arc<StatisticsAggregator>,
        interval: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            aggregator,
            interval,
            max_concurrency: max_concurrency.max(1),
            cycle_lock: Arc::new(Mutex::new(())),
            timer: std::sync::Mutex::new(None),
        }
    }

    /// Spawn the timer task. The first tick fires immediately.
    ///
    /// Calling `start` while the timer is already running does nothing.
    pub fn start(self: &Arc<Self>) {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if timer.is_some() {
            tracing::debug!("Statistics scheduler already running");
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            max_concurrency = self.max_concurrency,
            "Starting statistics scheduler"
        );

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        scheduler.run_cycle().await;
                    }
                    // Fires on the shutdown signal or when the sender is gone.
                    _ = shutdown_rx.changed() => break,
                }
            }

            tracing::info!("Statistics scheduler stopped");
        });

        *timer = Some(TimerTask { shutdown, handle });
    }

    /// Signal the timer task to stop and wait for it to exit.
    ///
    /// A cycle already in progress is allowed to finish.
    pub async fn stop(&self) {
        let task = self
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            if let Err(e) = task.handle.await {
                tracing::warn!(error = %e, "Statistics scheduler task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .map(|timer| timer.is_some())
            .unwrap_or(false)
    }

    /// Timer entry point: skipped if another cycle is in flight.
    pub async fn run_cycle(&self) -> CycleReport {
        let Ok(guard) = Arc::clone(&self.cycle_lock).try_lock_owned() else {
            tracing::warn!("Previous statistics cycle still running, skipping tick");
            return CycleReport::skipped();
        };
        self.spawn_cycle(guard, Utc::now()).await
    }

    /// Manual trigger: waits for any in-flight cycle, then runs.
    pub async fn run_cycle_now(&self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Manual trigger anchored at `now` instead of the current time.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        tracing::info!("Manual statistics recompute requested");
        let guard = Arc::clone(&self.cycle_lock).lock_owned().await;
        self.spawn_cycle(guard, now).await
    }

    /// Run a cycle on its own task, which keeps `guard` until the cycle ends.
    ///
    /// Dropping the returned future does not cancel the cycle or release
    /// the lock early.
    async fn spawn_cycle(&self, guard: OwnedMutexGuard<()>, now: DateTime<Utc>) -> CycleReport {
        let aggregator = Arc::clone(&self.aggregator);
        let max_concurrency = self.max_concurrency;

        let handle = tokio::spawn(async move {
            let report = execute_cycle(aggregator, max_concurrency, now).await;
            drop(guard);
            report
        });

        handle.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Statistics cycle task ended abnormally");
            CycleReport::default()
        })
    }
}

/// One pass over every runner, anchored at `now`.
async fn execute_cycle(
    aggregator: Arc<StatisticsAggregator>,
    max_concurrency: usize,
    now: DateTime<Utc>,
) -> CycleReport {
    let started = Instant::now();
    tracing::info!("Starting statistics cycle");

    let runners = match aggregator.records().list_distinct_runners().await {
        Ok(runners) => runners,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list runners, skipping cycle");
            return CycleReport {
                listing_failed: true,
                ..CycleReport::default()
            };
        }
    };

    let total = runners.len() as u32;

    let outcomes: Vec<(String, bool)> = stream::iter(runners)
        .map(|runner| {
            let aggregator = Arc::clone(&aggregator);
            async move {
                // Each runner gets its own task so a panic stays contained.
                let task_runner = runner.clone();
                let result = tokio::spawn(async move {
                    aggregator
                        .recompute_current_periods(&task_runner, now)
                        .await
                })
                .await;

                let ok = match result {
                    Ok(Ok(_)) => {
                        tracing::debug!(runner = %runner, "Generated statistics for runner");
                        true
                    }
                    Ok(Err(e)) => {
                        tracing::error!(
                            runner = %runner,
                            error = %e,
                            "Error generating statistics for runner"
                        );
                        false
                    }
                    Err(e) => {
                        tracing::error!(
                            runner = %runner,
                            error = %e,
                            "Statistics task for runner panicked"
                        );
                        false
                    }
                };
                (runner, ok)
            }
        })
        .buffer_unordered(max_concurrency)
        .collect()
        .await;

    let mut failed: Vec<String> = outcomes
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(runner, _)| runner.clone())
        .collect();
    failed.sort();

    let report = CycleReport {
        runners: total,
        succeeded: total - failed.len() as u32,
        failed,
        listing_failed: false,
        skipped: false,
    };

    tracing::info!(
        runners = report.runners,
        succeeded = report.succeeded,
        failed = report.failed.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Completed statistics cycle"
    );

    report
}
