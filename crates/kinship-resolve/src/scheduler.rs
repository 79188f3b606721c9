//! Periodic cache cleanup.
//!
//! Runs [`CacheSynchronizer::cleanup_expired_cache`] on a fixed interval,
//! independently of resolution traffic. A failed pass is logged and the
//! loop carries on.

use std::future::Future;

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::sync::CacheSynchronizer;

pub struct CleanupScheduler {
    synchronizer: CacheSynchronizer,
    every: Duration,
}

impl CleanupScheduler {
    pub fn new(synchronizer: CacheSynchronizer, every: Duration) -> Self {
        Self {
            synchronizer,
            every: every.max(Duration::from_secs(1)),
        }
    }

    /// Run cleanup passes forever.
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Run cleanup passes until `shutdown` resolves. The first pass runs
    /// immediately.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(interval_secs = self.every.as_secs(), "Cleanup scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.synchronizer.cleanup_expired_cache().await {
                        tracing::error!(error = %e, "Scheduled cache cleanup failed");
                    }
                }
            }
        }

        tracing::info!("Cleanup scheduler stopped");
    }
}
