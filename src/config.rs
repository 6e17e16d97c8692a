// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use std::env;
use std::time::Duration;

/// Default recompute interval (10 minutes).
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 600;
/// Default number of runners recomputed concurrently within one cycle.
pub const DEFAULT_STATS_MAX_CONCURRENCY: usize = 8;

/// Which backend holds activity records and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process maps; data is lost on restart.
    Memory,
    Firestore,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore backend)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Interval between scheduled statistics cycles
    pub stats_interval: Duration,
    /// Upper bound on runners recomputed at once
    pub stats_max_concurrency: usize,
    /// Shared secret for `/admin/*` routes. `None` disables them.
    pub admin_token: Option<String>,
}

impl Config {
    /// Config for tests: memory store, fixed admin token.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            stats_interval: Duration::from_secs(DEFAULT_STATS_INTERVAL_SECS),
            stats_max_concurrency: DEFAULT_STATS_MAX_CONCURRENCY,
            admin_token: Some("test_admin_token".to_string()),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STATS_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "firestore" => StoreBackend::Firestore,
            _ => return Err(ConfigError::Invalid("STATS_STORE")),
        };

        let gcp_project_id = match env::var("GCP_PROJECT_ID") {
            Ok(id) => id,
            Err(_) if store_backend == StoreBackend::Firestore => {
                return Err(ConfigError::Missing("GCP_PROJECT_ID"))
            }
            Err(_) => "local-dev".to_string(),
        };

        let interval_secs = parse_or("STATS_INTERVAL_SECS", DEFAULT_STATS_INTERVAL_SECS)?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid("STATS_INTERVAL_SECS"));
        }

        let stats_max_concurrency =
            parse_or("STATS_MAX_CONCURRENCY", DEFAULT_STATS_MAX_CONCURRENCY)?;
        if stats_max_concurrency == 0 {
            return Err(ConfigError::Invalid("STATS_MAX_CONCURRENCY"));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            stats_interval: Duration::from_secs(interval_secs),
            stats_max_concurrency,
            admin_token: env::var("ADMIN_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
