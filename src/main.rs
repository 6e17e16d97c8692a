// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runner-Stats API Server
//!
//! Keeps weekly, monthly and yearly running statistics up to date by
//! periodically recomputing them from raw activity records.

use runner_stats::{
    config::{Config, StoreBackend},
    db::{ActivityRecordStore, FirestoreDb, MemoryStore, StatisticsStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        store = ?config.store_backend,
        interval_secs = config.stats_interval.as_secs(),
        max_concurrency = config.stats_max_concurrency,
        "Starting Runner-Stats API"
    );

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set; admin routes will refuse all requests");
    }

    // Initialize the record and statistics stores
    let (records, statistics): (Arc<dyn ActivityRecordStore>, Arc<dyn StatisticsStore>) =
        match config.store_backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; statistics are lost on restart");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
            StoreBackend::Firestore => {
                let db = Arc::new(
                    FirestoreDb::new(&config.gcp_project_id)
                        .await
                        .expect("Failed to connect to Firestore"),
                );
                (db.clone(), db)
            }
        };

    // Build shared state and start the periodic recompute
    let state = Arc::new(AppState::new(config.clone(), records, statistics));
    state.scheduler.start();

    // Build router
    let app = runner_stats::routes::create_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight cycle finish before exiting
    state.scheduler.stop().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("runner_stats=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
