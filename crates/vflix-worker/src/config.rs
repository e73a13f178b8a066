//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Worker pool size (concurrent jobs)
    pub concurrency: usize,
    /// Per-stage timeout; the HLS stage derives its own larger budget
    pub stage_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// How often to scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
    /// How often to move due delayed jobs onto the stream
    pub scheduled_pump_interval: Duration,
    /// Prometheus listener address
    pub metrics_addr: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            stage_timeout: Duration::from_secs(900),
            shutdown_timeout: Duration::from_secs(60),
            claim_interval: Duration::from_secs(60),
            claim_min_idle: Duration::from_secs(1800),
            scheduled_pump_interval: Duration::from_secs(5),
            metrics_addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One worker per CPU core, never fewer than two.
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .max(2)
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            concurrency: std::env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or_else(default_concurrency),
            stage_timeout: Duration::from_secs(
                std::env::var("PIPELINE_STAGE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            scheduled_pump_interval: Duration::from_secs(
                std::env::var("WORKER_SCHEDULED_PUMP_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            metrics_addr: std::env::var("METRICS_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:9090".to_string()),
        }
    }
}
