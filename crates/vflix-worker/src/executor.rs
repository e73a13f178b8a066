//! Job executor.
//!
//! A semaphore-bounded worker pool consumes the single FIFO stream. Each
//! job runs start-to-finish on one worker task; failed jobs are retried
//! through the delayed queue with exponential backoff or parked in the
//! DLQ once their budget is spent.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vflix_models::ErrorKind;
use vflix_queue::{JobQueue, QueueJob};

use crate::config::WorkerConfig;
use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::retry::job_retry_delay;
use crate::{delete, export, hls, pipeline, probe, thumbnail};

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: Arc<JobQueue>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.concurrency));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Receiver that flips to true when shutdown begins.
    ///
    /// Built into the processing context so encoder runs abort promptly.
    pub fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Start the executor.
    pub async fn run(&self, ctx: ProcessingContext) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} workers",
            self.consumer_name, self.config.concurrency
        );

        self.queue.init().await?;

        let ctx = Arc::new(ctx);
        let mut shutdown_rx = self.shutdown.subscribe();

        let claim_task = self.spawn_claim_task(Arc::clone(&ctx));
        let pump_task = self.spawn_scheduled_pump();

        // Main job consumption loop.
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs(&ctx) => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();
        pump_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Periodically claim jobs abandoned by crashed workers.
    fn spawn_claim_task(&self, ctx: Arc<ProcessingContext>) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let claim_interval = self.config.claim_interval;
        let min_idle_ms = self.config.claim_min_idle.as_millis() as u64;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue.claim_pending(&consumer_name, min_idle_ms, 5).await {
                            Ok(jobs) if !jobs.is_empty() => {
                                info!("Claimed {} pending jobs", jobs.len());
                                for (message_id, job) in jobs {
                                    let Ok(permit) =
                                        Arc::clone(&semaphore).acquire_owned().await
                                    else {
                                        return;
                                    };
                                    let ctx = Arc::clone(&ctx);
                                    let queue = Arc::clone(&queue);
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(ctx, queue, message_id, job).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Failed to claim pending jobs: {}", e);
                            }
                        }
                    }
                }
            }
        })
    }

    /// Periodically move due delayed jobs (retry backoff) onto the stream.
    fn spawn_scheduled_pump(&self) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let pump_interval = self.config.scheduled_pump_interval;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(pump_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = queue.process_scheduled_jobs().await {
                            warn!("Failed to pump scheduled jobs: {}", e);
                        }
                    }
                }
            }
        })
    }

    /// Consume and dispatch jobs from the queue.
    async fn consume_jobs(&self, ctx: &Arc<ProcessingContext>) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All workers busy.
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(
                &self.consumer_name,
                1000,             // block for 1 second
                available.min(5), // at most 5 jobs per read
            )
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let ctx = Arc::clone(ctx);
            let queue = Arc::clone(&self.queue);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, queue, message_id, job).await;
            });
        }

        Ok(())
    }

    /// Execute a single job with retry and DLQ handling.
    async fn execute_job(
        ctx: Arc<ProcessingContext>,
        queue: Arc<JobQueue>,
        message_id: String,
        job: QueueJob,
    ) {
        let job_id = job.job_id().clone();
        let stage = job.stage();
        info!("Executing {} job {} (attempt {})", stage, job_id, job.attempt());

        let started = std::time::Instant::now();
        let result = Self::run_stage(&ctx, &job).await;
        histogram!("vflix_job_duration_seconds", "stage" => stage)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                counter!("vflix_jobs_total", "stage" => stage, "outcome" => "ok").increment(1);
                info!("Job {} completed successfully", job_id);
                if let Err(e) = queue.ack(&message_id).await {
                    error!("Failed to ack job {}: {}", job_id, e);
                }
                if let Err(e) = queue.clear_dedup(&job).await {
                    warn!("Failed to clear dedup key for job {}: {}", job_id, e);
                }
            }
            Err(e) => {
                let kind = e.kind();
                counter!("vflix_jobs_total", "stage" => stage, "outcome" => kind.as_str())
                    .increment(1);
                error!("Job {} failed ({}): {}", job_id, kind, e);

                if kind == ErrorKind::Cancelled {
                    // Shutdown teardown: leave the message pending so a live
                    // worker reclaims it after the idle threshold.
                    queue.clear_dedup(&job).await.ok();
                    return;
                }

                let attempt = job.attempt();
                if attempt < kind.retry_budget() {
                    Self::schedule_retry(&queue, &message_id, &job, attempt).await;
                } else {
                    if kind.is_fatal_for_record() {
                        if let Some(video_id) = job.video_id() {
                            if let Err(db_err) = ctx.videos.mark_failed(video_id).await {
                                error!("Failed to mark video {} failed: {}", video_id, db_err);
                            }
                        }
                    }
                    if let Err(dlq_err) = queue.dlq(&message_id, &job, &e.to_string()).await {
                        error!("Failed to move job {} to DLQ: {}", job_id, dlq_err);
                    }
                    queue.clear_dedup(&job).await.ok();
                }
            }
        }
    }

    /// Re-enqueue a failed job through the delayed queue.
    async fn schedule_retry(queue: &JobQueue, message_id: &str, job: &QueueJob, attempt: u32) {
        let delay = job_retry_delay(attempt);
        info!(
            "Job {} will be retried in {}s (attempt {})",
            job.job_id(),
            delay.as_secs(),
            attempt + 1
        );

        // Clear the dedup key first so the retry copy is accepted.
        queue.clear_dedup(job).await.ok();
        if let Err(e) = queue.enqueue_delayed(job.with_next_attempt(), delay).await {
            error!("Failed to schedule retry for job {}: {}", job.job_id(), e);
            return;
        }
        if let Err(e) = queue.ack(message_id).await {
            error!("Failed to ack retried job {}: {}", job.job_id(), e);
        }
    }

    /// Run one stage handler, bounded by the stage timeout.
    ///
    /// The HLS stage budgets itself (`max(timeout, 3 * duration)`), so it
    /// gets no outer bound here.
    async fn run_stage(ctx: &Arc<ProcessingContext>, job: &QueueJob) -> WorkerResult<()> {
        let outer_timeout = match job {
            QueueJob::TranscodeHls(_) => None,
            _ => Some(ctx.config.stage_timeout),
        };

        let fut = Self::dispatch(ctx, job);
        match outer_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(WorkerError::StageTimeout(timeout.as_secs())),
            },
            None => fut.await,
        }
    }

    /// Dispatch a job to its stage handler.
    async fn dispatch(ctx: &Arc<ProcessingContext>, job: &QueueJob) -> WorkerResult<()> {
        match job {
            QueueJob::ProcessVideo(j) => pipeline::run_process_video(ctx, j).await,
            QueueJob::Probe(j) => probe::run_probe(ctx, j.video_id, &j.source_key)
                .await
                .map(|_| ()),
            QueueJob::Thumbnail(j) => {
                thumbnail::run_thumbnail(ctx, j.video_id, &j.source_key, &j.base)
                    .await
                    .map(|_| ())
            }
            QueueJob::TranscodeHls(j) => {
                hls::run_transcode_hls(ctx, j.video_id, &j.source_key, &j.base)
                    .await
                    .map(|_| ())
            }
            QueueJob::DeleteAssets(j) => delete::run_delete_assets(ctx, j).await,
            QueueJob::ExportSnapshot(j) => export::run_export(ctx, j).await.map(|_| ()),
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.concurrency {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
