//! Job queue using Redis Streams.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::QueueJob;

/// Key of the sorted set holding delayed jobs.
const SCHEDULED_KEY: &str = "vflix:scheduled_jobs";
/// Dedup keys expire after this many seconds.
const DEDUP_TTL_SECS: u64 = 3600;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue broker connection URL
    pub queue_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_url: "redis://localhost:6379".to_string(),
            stream_name: "vflix:jobs".to_string(),
            consumer_group: "vflix:workers".to_string(),
            dlq_stream_name: "vflix:dlq".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            queue_url: std::env::var("QUEUE_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM")
                .unwrap_or_else(|_| "vflix:jobs".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "vflix:workers".to_string()),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM")
                .unwrap_or_else(|_| "vflix:dlq".to_string()),
        }
    }
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.queue_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Redis client handle, shared with the scheduler and rate gate.
    pub fn redis_client(&self) -> redis::Client {
        self.client.clone()
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue a job.
    ///
    /// A job whose idempotency key is already in flight is rejected with
    /// `EnqueueFailed`; the dedup key is cleared on terminal completion.
    pub async fn enqueue(&self, job: QueueJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let idempotency_key = job.idempotency_key();

        let dedup_key = format!("vflix:dedup:{idempotency_key}");
        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            warn!("Duplicate job rejected: {}", idempotency_key);
            return Err(QueueError::enqueue_failed("Duplicate job"));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await?;

        conn.set_ex::<_, _, ()>(&dedup_key, "1", DEDUP_TTL_SECS).await?;

        info!(
            "Enqueued {} job {} with message ID {}",
            job.stage(),
            job.job_id(),
            message_id
        );

        Ok(message_id)
    }

    /// Store a job in the delayed set; it moves to the stream once due.
    pub async fn enqueue_delayed(&self, job: QueueJob, delay: Duration) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let visible_at = now + delay.as_secs();

        redis::cmd("ZADD")
            .arg(SCHEDULED_KEY)
            .arg(visible_at)
            .arg(&payload)
            .query_async::<()>(&mut conn)
            .await?;

        info!(
            job_id = %job.job_id(),
            delay_secs = delay.as_secs(),
            "Scheduled {} job with delay",
            job.stage()
        );

        Ok(())
    }

    /// Move due delayed jobs onto the stream.
    ///
    /// Called periodically by the executor. Returns how many jobs moved.
    pub async fn process_scheduled_jobs(&self) -> QueueResult<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let due_jobs: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(SCHEDULED_KEY)
            .arg(0)
            .arg(now)
            .query_async(&mut conn)
            .await?;

        if due_jobs.is_empty() {
            return Ok(0);
        }

        let mut moved = 0;

        for payload in &due_jobs {
            match serde_json::from_str::<QueueJob>(payload) {
                Ok(job) => match self.enqueue(job).await {
                    Ok(_) => moved += 1,
                    Err(QueueError::EnqueueFailed { .. }) => {
                        debug!("Scheduled job was duplicate, dropping from schedule");
                    }
                    Err(e) => {
                        warn!("Failed to enqueue scheduled job: {}", e);
                        continue; // keep it scheduled
                    }
                },
                Err(e) => {
                    warn!("Failed to parse scheduled job: {}", e);
                }
            }

            redis::cmd("ZREM")
                .arg(SCHEDULED_KEY)
                .arg(payload)
                .query_async::<()>(&mut conn)
                .await
                .ok();
        }

        if moved > 0 {
            info!(count = moved, "Moved scheduled jobs to main queue");
        }

        Ok(moved)
    }

    /// Acknowledge a job (mark as completed).
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged job: {}", message_id);
        Ok(())
    }

    /// Clear the deduplication key so the same stage can be enqueued again.
    pub async fn clear_dedup(&self, job: &QueueJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let dedup_key = format!("vflix:dedup:{}", job.idempotency_key());
        conn.del::<_, ()>(&dedup_key).await?;
        debug!("Cleared dedup key: {}", dedup_key);
        Ok(())
    }

    /// Move a job to the dead letter queue.
    pub async fn dlq(&self, message_id: &str, job: &QueueJob, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;

        warn!("Moved job {} to DLQ: {}", job.job_id(), error);
        Ok(())
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Get DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Consume jobs from the queue.
    ///
    /// Returns `(message_id, job)` pairs; malformed payloads are acked away.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, QueueJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">") // only new messages
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<QueueJob>(&payload_str) {
                        Ok(job) => {
                            debug!("Consumed job {} from stream", job.job_id());
                            jobs.push((message_id, job));
                        }
                        Err(e) => {
                            warn!("Failed to parse job payload: {}", e);
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Claim pending jobs that have been idle for too long.
    ///
    /// This hands jobs from crashed workers to a live consumer.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, QueueJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending_count: usize = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await
            .map(|reply: redis::streams::StreamPendingReply| reply.count())
            .unwrap_or(0);

        if pending_count == 0 {
            return Ok(Vec::new());
        }

        // XPENDING stream group - + count: [id, consumer, idle_ms, deliveries]
        let pending_details: Vec<Vec<redis::Value>> = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut stale_ids = Vec::new();
        for detail in pending_details {
            if let (Some(redis::Value::BulkString(id)), Some(redis::Value::Int(idle_ms))) =
                (detail.first(), detail.get(2))
            {
                if *idle_ms as u64 >= min_idle_ms {
                    if let Ok(id) = String::from_utf8(id.clone()) {
                        stale_ids.push(id);
                    }
                }
            }
        }

        if stale_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms);
        for id in &stale_ids {
            cmd.arg(id);
        }

        // XCLAIM reply: [[id, [field, value, ...]], ...]
        let claimed: Vec<Vec<redis::Value>> = cmd.query_async(&mut conn).await?;

        let mut jobs = Vec::new();
        for message in claimed {
            let (Some(redis::Value::BulkString(id)), Some(redis::Value::Array(fields))) =
                (message.first(), message.get(1))
            else {
                continue;
            };
            let Ok(message_id) = String::from_utf8(id.clone()) else {
                continue;
            };
            let Some(payload) = field_value(fields, "job") else {
                continue;
            };

            match serde_json::from_str::<QueueJob>(&payload) {
                Ok(job) => {
                    info!("Claimed pending job {} from stream", job.job_id());
                    jobs.push((message_id, job));
                }
                Err(e) => {
                    warn!("Failed to parse claimed job payload: {}", e);
                    self.ack(&message_id).await.ok();
                }
            }
        }

        Ok(jobs)
    }
}

/// Find a field's value in a flat [field, value, ...] reply array.
fn field_value(fields: &[redis::Value], wanted: &str) -> Option<String> {
    let mut i = 0;
    while i + 1 < fields.len() {
        if let (redis::Value::BulkString(field), redis::Value::BulkString(value)) =
            (&fields[i], &fields[i + 1])
        {
            if field.as_slice() == wanted.as_bytes() {
                return String::from_utf8(value.clone()).ok();
            }
        }
        i += 2;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_scans_pairs() {
        let fields = vec![
            redis::Value::BulkString(b"key".to_vec()),
            redis::Value::BulkString(b"thumbnail:1".to_vec()),
            redis::Value::BulkString(b"job".to_vec()),
            redis::Value::BulkString(b"{\"type\":\"probe\"}".to_vec()),
        ];
        assert_eq!(
            field_value(&fields, "job").as_deref(),
            Some("{\"type\":\"probe\"}")
        );
        assert_eq!(
            field_value(&fields, "key").as_deref(),
            Some("thumbnail:1")
        );
        assert!(field_value(&fields, "missing").is_none());
    }

    #[test]
    fn config_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.stream_name, "vflix:jobs");
        assert_eq!(config.consumer_group, "vflix:workers");
        assert_eq!(config.dlq_stream_name, "vflix:dlq");
    }
}
