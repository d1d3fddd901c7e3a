//! InMemoryRecordStore - 開発・テスト用の永続化層
//!
//! # 実装詳細
//! - BTreeMap<RecordId, ExpirableRecord>（ID の文字列順）
//! - tokio::sync::Mutex で排他制御
//! - 現在時刻は注入された Clock から取得

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{DeleteError, ExpirableRecord, ExpiryFilter, RecordId, StorageError};
use crate::ports::{Clock, RecordStore, SystemClock};

/// In-memory record store.
pub struct InMemoryRecordStore<C = SystemClock> {
    records: Mutex<BTreeMap<RecordId, ExpirableRecord>>,
    clock: C,
}

impl InMemoryRecordStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryRecordStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryRecordStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    /// Insert (or replace) a record.
    pub async fn insert(&self, record: ExpirableRecord) {
        self.records.lock().await.insert(record.id.clone(), record);
    }

    /// Insert a record created at `created_at` and return its id.
    pub async fn insert_created_at(&self, created_at: DateTime<Utc>) -> RecordId {
        let record = ExpirableRecord::created(created_at);
        let id = record.id.clone();
        self.insert(record).await;
        id
    }

    pub async fn contains(&self, id: &RecordId) -> bool {
        self.records.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Snapshot of all records in id order.
    pub async fn records(&self) -> Vec<ExpirableRecord> {
        self.records.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl<C: Clock> RecordStore for InMemoryRecordStore<C> {
    async fn find_expired(
        &self,
        filter: &ExpiryFilter,
    ) -> Result<Vec<ExpirableRecord>, StorageError> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|record| filter.is_expired(record.created_at))
            .cloned()
            .collect())
    }

    async fn delete(&self, record: &ExpirableRecord) -> Result<(), DeleteError> {
        match self.records.lock().await.remove(&record.id) {
            Some(_) => Ok(()),
            None => Err(DeleteError::NotFound(record.id.clone())),
        }
    }

    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError> {
        Ok(self.clock.now())
    }
}
