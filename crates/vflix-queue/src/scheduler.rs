//! Periodic scheduler.
//!
//! Handlers are identified by stable name. Registration is idempotent in
//! the fail-fast sense: registering a name twice is refused, so a startup
//! path that runs more than once cannot double-schedule a handler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{QueueError, QueueResult};

/// Process-local periodic scheduler.
///
/// Guarded by a single-writer discipline at startup: register everything
/// before the worker begins consuming, then leave it alone.
pub struct PeriodicScheduler {
    handlers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl PeriodicScheduler {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a named handler to run every `interval`.
    ///
    /// The first tick fires after one full interval. Returns
    /// `SchedulerBusy` if the name is already registered.
    pub fn register<F, Fut>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        handler: F,
    ) -> QueueResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let name = name.into();
        let mut handlers = self.handlers.lock().expect("scheduler lock poisoned");

        if handlers.contains_key(&name) {
            return Err(QueueError::scheduler_busy(name));
        }

        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would run the handler at startup;
            // skip it so the cadence starts one interval from now.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("Periodic handler '{}' firing", task_name);
                handler().await;
            }
        });

        info!(
            "Registered periodic handler '{}' every {}s",
            name,
            interval.as_secs()
        );
        handlers.insert(name, handle);
        Ok(())
    }

    /// Whether a handler name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers
            .lock()
            .expect("scheduler lock poisoned")
            .contains_key(name)
    }

    /// Abort all scheduled handlers (shutdown path).
    pub fn shutdown(&self) {
        let mut handlers = self.handlers.lock().expect("scheduler lock poisoned");
        for (name, handle) in handlers.drain() {
            handle.abort();
            info!("Stopped periodic handler '{}'", name);
        }
    }
}

impl Default for PeriodicScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        if let Ok(mut handlers) = self.handlers.lock() {
            for (name, handle) in handlers.drain() {
                handle.abort();
                error!("Periodic handler '{}' dropped while registered", name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn duplicate_registration_is_refused() {
        let scheduler = PeriodicScheduler::new();

        scheduler
            .register("export_watch_history", Duration::from_secs(3600), || async {})
            .unwrap();
        assert!(scheduler.is_registered("export_watch_history"));

        let err = scheduler
            .register("export_watch_history", Duration::from_secs(3600), || async {})
            .unwrap_err();
        assert!(matches!(err, QueueError::SchedulerBusy(_)));

        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn handler_fires_on_the_interval() {
        let scheduler = PeriodicScheduler::new();
        let count = Arc::new(AtomicU32::new(0));

        let count_clone = Arc::clone(&count);
        scheduler
            .register("ticker", Duration::from_secs(10), move || {
                let count = Arc::clone(&count_clone);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

        // No immediate fire at registration
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        scheduler.shutdown();
    }
}
