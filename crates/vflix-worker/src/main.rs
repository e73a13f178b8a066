//! Video ingestion worker binary.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vflix_models::SnapshotEntity;
use vflix_queue::{ExportSnapshotJob, JobQueue, PeriodicScheduler, QueueError, QueueJob};
use vflix_storage::ObjectStore;
use vflix_worker::{JobExecutor, ProcessingContext, WorkerConfig};

/// Cadence of the authoritative watch-history export.
const EXPORT_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS transports)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("vflix=info".parse().unwrap()))
        .init();

    info!("Starting vflix-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Prometheus endpoint
    match config.metrics_addr.parse::<std::net::SocketAddr>() {
        Ok(addr) => {
            if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
            {
                warn!("Failed to install metrics exporter: {}", e);
            }
        }
        Err(e) => warn!("Invalid METRICS_ADDR '{}': {}", config.metrics_addr, e),
    }

    // Database
    let pool = match vflix_db::connect_from_env().await {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    // Object store
    let storage = match ObjectStore::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to configure object store: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = storage.check_connectivity().await {
        warn!("Object store connectivity check failed: {}", e);
    }

    // Queue
    let queue = match JobQueue::from_env() {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    // Hourly watch-history export. Registration refuses duplicates, so a
    // second call here would fail loudly instead of double-scheduling.
    let scheduler = PeriodicScheduler::new();
    let export_queue = Arc::clone(&queue);
    let registration = scheduler.register("export_watch_history", EXPORT_INTERVAL, move || {
        let queue = Arc::clone(&export_queue);
        async move {
            let job = ExportSnapshotJob::new(SnapshotEntity::WatchHistory);
            match queue.enqueue(QueueJob::ExportSnapshot(job)).await {
                Ok(_) => {}
                Err(QueueError::EnqueueFailed(_)) => {
                    info!("Watch-history export already in flight");
                }
                Err(e) => warn!("Failed to enqueue scheduled export: {}", e),
            }
        }
    });
    if let Err(e) = registration {
        error!("Failed to register export schedule: {}", e);
        std::process::exit(1);
    }

    // Executor + shared context
    let executor = Arc::new(JobExecutor::new(config.clone(), Arc::clone(&queue)));
    let ctx = ProcessingContext::new(config, pool, storage, queue, executor.cancel_receiver());

    // Ctrl-C flips the shutdown signal; in-flight encoder runs abort.
    let shutdown_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_executor.shutdown();
    });

    if let Err(e) = executor.run(ctx).await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    scheduler.shutdown();
    info!("Worker shutdown complete");
}
