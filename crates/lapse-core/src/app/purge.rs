//! PurgeService - 期限切れレコードの削除
//!
//! # フロー
//! 1. `ExpiryFilter`（age > retention）を RecordStore に渡して検索
//! 2. 一致したレコードを 1 件ずつ削除（バッチ全体のトランザクションなし）
//! 3. 削除件数を `PurgeResult` として返す
//!
//! StorageError が起きたら残りを中断してエラーを返す。削除済みの分は戻さない。

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::domain::{DeleteError, ExpiryFilter, PurgeError, PurgeResult, RetentionPeriod};
use crate::ports::RecordStore;

/// Configuration passed to the service at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeConfig {
    pub retention: RetentionPeriod,

    /// Query and count only; delete nothing.
    pub dry_run: bool,
}

impl PurgeConfig {
    pub fn with_retention(retention: RetentionPeriod) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }
}

pub struct PurgeService<S> {
    store: S,
    config: PurgeConfig,
}

impl<S: RecordStore> PurgeService<S> {
    pub fn new(store: S, config: PurgeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Purge every record older than the retention period as of `now`.
    ///
    /// Zero matches is a successful run with `deleted_count == 0`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<PurgeResult, PurgeError> {
        let retention = self.config.retention;
        let filter = ExpiryFilter::new(now, retention);

        let records = self
            .store
            .find_expired(&filter)
            .await
            .map_err(PurgeError::Query)?;

        let mut result = PurgeResult {
            retention_days: retention.whole_days(),
            matched_count: records.len() as u64,
            dry_run: self.config.dry_run,
            ..PurgeResult::default()
        };

        if self.config.dry_run {
            info!(
                matched = result.matched_count,
                retention_days = result.retention_days,
                now = %now,
                "DRY RUN: purge would delete expired records"
            );
            return Ok(result);
        }

        for record in &records {
            match self.store.delete(record).await {
                Ok(()) => {
                    result.deleted_count += 1;
                    debug!(record_id = %record.id, created_at = %record.created_at, "deleted expired record");
                }
                Err(DeleteError::NotFound(record_id)) => {
                    result.already_gone_count += 1;
                    warn!(record_id = %record_id, "expired record already gone");
                }
                Err(DeleteError::Storage(source)) => {
                    error!(
                        record_id = %record.id,
                        deleted = result.deleted_count,
                        remaining = result.matched_count - result.deleted_count - result.already_gone_count,
                        error = %source,
                        "purge aborted"
                    );
                    return Err(PurgeError::Aborted {
                        deleted: result.deleted_count,
                        record_id: record.id.clone(),
                        source,
                    });
                }
            }
        }

        info!(
            deleted = result.deleted_count,
            matched = result.matched_count,
            already_gone = result.already_gone_count,
            retention_days = result.retention_days,
            "purge run complete"
        );

        Ok(result)
    }

    /// `run` with `now` taken from the store's own clock.
    pub async fn run_at_store_time(&self) -> Result<PurgeResult, PurgeError> {
        let now = self
            .store
            .current_time()
            .await
            .map_err(PurgeError::Query)?;
        self.run(now).await
    }
}
