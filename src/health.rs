use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::services::PriceFeed;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: HashMap<String, DependencyStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyStatus {
    Healthy { status: String, latency_ms: u64 },
    Unhealthy { status: String, error: String },
}

impl DependencyStatus {
    fn unhealthy(error: impl Into<String>) -> Self {
        DependencyStatus::Unhealthy {
            status: "unhealthy".to_string(),
            error: error.into(),
        }
    }

    fn healthy(start: Instant) -> Self {
        DependencyStatus::Healthy {
            status: "healthy".to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[async_trait]
pub trait DependencyChecker: Send + Sync {
    fn name(&self) -> &'static str;

    /// A critical failure makes the service unhealthy, any other failure degraded.
    fn critical(&self) -> bool {
        false
    }

    async fn check(&self) -> DependencyStatus;
}

pub struct PostgresChecker {
    pool: sqlx::PgPool,
}

impl PostgresChecker {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DependencyChecker for PostgresChecker {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn critical(&self) -> bool {
        true
    }

    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => DependencyStatus::healthy(start),
            Err(e) => DependencyStatus::unhealthy(e.to_string()),
        }
    }
}

/// Unhealthy while quotes are served from the fallback table.
pub struct PriceFeedChecker {
    feed: PriceFeed,
}

impl PriceFeedChecker {
    pub fn new(feed: PriceFeed) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl DependencyChecker for PriceFeedChecker {
    fn name(&self) -> &'static str {
        "price_feed"
    }

    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        let table = self.feed.current().await;
        if table.fallback {
            DependencyStatus::unhealthy("serving fallback prices")
        } else {
            DependencyStatus::healthy(start)
        }
    }
}

pub async fn check_health(
    checkers: &[Box<dyn DependencyChecker>],
    start_time: Instant,
) -> HealthResponse {
    let timeout_duration = Duration::from_secs(5);

    let results = run_checks(checkers, timeout_duration).await;

    let mut dependencies = HashMap::new();
    let mut has_critical_failure = false;
    let mut has_non_critical_failure = false;

    for (checker, status) in checkers.iter().zip(results) {
        if matches!(status, DependencyStatus::Unhealthy { .. }) {
            if checker.critical() {
                has_critical_failure = true;
            } else {
                has_non_critical_failure = true;
            }
        }
        dependencies.insert(checker.name().to_string(), status);
    }

    let status = if has_critical_failure {
        "unhealthy"
    } else if has_non_critical_failure {
        "degraded"
    } else {
        "healthy"
    };

    HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        dependencies,
    }
}

async fn run_checks(
    checkers: &[Box<dyn DependencyChecker>],
    limit: Duration,
) -> Vec<DependencyStatus> {
    let mut handles = Vec::with_capacity(checkers.len());
    for checker in checkers {
        handles.push(async move {
            timeout(limit, checker.check())
                .await
                .unwrap_or_else(|_| DependencyStatus::unhealthy("timeout"))
        });
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await);
    }
    results
}
