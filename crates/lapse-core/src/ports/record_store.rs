//! RecordStore port - 期限付きレコードの永続化層
//!
//! # 実装
//! - **InMemoryRecordStore**: 開発・テスト用（`impls`）
//! - **SqliteRecordStore**: `lapse-sqlite` クレート

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DeleteError, ExpirableRecord, ExpiryFilter, StorageError};

/// RecordStore は purge に必要な query / delete を提供
///
/// # 設計原則
/// - しきい値は `ExpiryFilter` として型付きで渡す（文字列補間しない）
/// - delete はレコード単位で独立・冪等（削除済みなら `DeleteError::NotFound`）
/// - 同時実行時の整合性は実装側のトランザクション・ロックに委ねる
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `filter` に一致する（age > retention の）レコードをすべて返す
    async fn find_expired(
        &self,
        filter: &ExpiryFilter,
    ) -> Result<Vec<ExpirableRecord>, StorageError>;

    /// レコードを 1 件削除
    async fn delete(&self, record: &ExpirableRecord) -> Result<(), DeleteError>;

    /// ストア自身の時計での現在時刻
    ///
    /// サービスとストアの時計のずれを避けたい場合に `now` として使う。
    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn find_expired(
        &self,
        filter: &ExpiryFilter,
    ) -> Result<Vec<ExpirableRecord>, StorageError> {
        (**self).find_expired(filter).await
    }

    async fn delete(&self, record: &ExpirableRecord) -> Result<(), DeleteError> {
        (**self).delete(record).await
    }

    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError> {
        (**self).current_time().await
    }
}
