//! PurgeLoop - 定期的な purge の実行
//!
//! # フロー
//! 1. interval ごとに tick
//! 2. ストアの時計を `now` として PurgeService::run を実行
//! 3. 失敗はログに残し、次の tick で再実行（削除は冪等）
//! 4. shutdown future が完了したら停止
//!
//! 1 回の run が終わるまで次の tick は来ない（重複実行なし）。

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::purge::PurgeService;
use crate::ports::RecordStore;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Counters accumulated over the lifetime of a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub failures: u64,
    pub deleted: u64,
}

pub struct PurgeLoop<S> {
    service: PurgeService<S>,
    interval: Duration,
}

impl<S: RecordStore> PurgeLoop<S> {
    pub fn new(service: PurgeService<S>, interval: Duration) -> Self {
        Self {
            service,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn service(&self) -> &PurgeService<S> {
        &self.service
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick until `shutdown` resolves. The first tick fires immediately.
    pub async fn run<F>(&self, shutdown: F) -> LoopStats
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.interval.as_secs(),
            retention_days = self.service.config().retention.whole_days(),
            dry_run = self.service.config().dry_run,
            "purge loop started"
        );

        let mut stats = LoopStats::default();
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(ticks = stats.ticks, failures = stats.failures, deleted = stats.deleted, "purge loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    stats.ticks += 1;
                    match self.service.run_at_store_time().await {
                        Ok(result) => {
                            stats.deleted += result.deleted_count;
                            if !result.has_deletions() {
                                debug!(tick = stats.ticks, "purge tick found no expired records");
                            }
                        }
                        Err(err) => {
                            stats.failures += 1;
                            stats.deleted += err.deleted_before_failure();
                            error!(tick = stats.ticks, error = %err, "purge tick failed");
                        }
                    }
                }
            }
        }
        stats
    }
}
