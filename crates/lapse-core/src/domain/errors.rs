//! Errors - エラー型と分類
//!
//! - StorageError: 永続化層が query / delete を完了できなかった（内部リトライなし）
//! - DeleteError::NotFound: 既に削除済み。purge を失敗させない
//! - PurgeError: 呼び出し側（harness）に返す、run が完了しなかったことを示すエラー

use thiserror::Error;

use super::ids::RecordId;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The persistence layer could not complete a query or delete.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage operation failed: {0}")]
    Backend(#[source] BoxError),
}

impl StorageError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Outcome of a single failed delete.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Benign: raced with another deleter.
    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A purge run that did not complete.
#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("failed to query expired records: {0}")]
    Query(#[source] StorageError),

    /// Deletes already applied are not rolled back.
    #[error("purge aborted after {deleted} deletions while deleting {record_id}: {source}")]
    Aborted {
        deleted: u64,
        record_id: RecordId,
        #[source]
        source: StorageError,
    },
}

impl PurgeError {
    /// Records removed before the failure.
    pub fn deleted_before_failure(&self) -> u64 {
        match self {
            PurgeError::Query(_) => 0,
            PurgeError::Aborted { deleted, .. } => *deleted,
        }
    }
}
