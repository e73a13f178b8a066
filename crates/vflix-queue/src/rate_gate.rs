//! Time-bucketed rate gate.
//!
//! A boolean guard keyed by `(id, time-bucket)`: the first caller inside a
//! bucket passes, every other caller in the same bucket is refused. Backed
//! by `SET NX EX` on a bucket-stamped Redis key, so the guard is shared
//! across processes and expires on its own.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::QueueResult;

/// Shared first-caller-in-window guard.
#[derive(Clone)]
pub struct RateGate {
    client: redis::Client,
}

impl RateGate {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Try to pass the gate for `key` within a `window`-wide bucket.
    ///
    /// Returns true for the first caller in the current bucket.
    pub async fn try_pass(&self, key: &str, window: Duration) -> QueueResult<bool> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let bucket = bucket_index(now, window.as_secs());
        let redis_key = format!("vflix:rategate:{key}:{bucket}");

        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // NX makes the first SET win; EX bounds the key to roughly one window.
        let admitted: bool = redis::cmd("SET")
            .arg(&redis_key)
            .arg(now)
            .arg("NX")
            .arg("EX")
            .arg(window.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .unwrap_or(false);

        if admitted {
            debug!("Rate gate '{}' admitted caller for bucket {}", key, bucket);
        } else {
            debug!("Rate gate '{}' refused caller for bucket {}", key, bucket);
        }

        Ok(admitted)
    }
}

/// Bucket index for a timestamp, given the window width in seconds.
fn bucket_index(now_secs: u64, window_secs: u64) -> u64 {
    now_secs / window_secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(bucket_index(0, 3600), 0);
        assert_eq!(bucket_index(3599, 3600), 0);
        assert_eq!(bucket_index(3600, 3600), 1);
        assert_eq!(bucket_index(7205, 3600), 2);
    }

    #[test]
    fn calls_within_one_window_share_a_bucket() {
        let first = bucket_index(10_000, 3600);
        let second = bucket_index(10_000 + 120, 3600);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_window_does_not_divide_by_zero() {
        assert_eq!(bucket_index(42, 0), 42);
    }
}
