//! Test doubles for the application layer.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{DeleteError, ExpirableRecord, ExpiryFilter, StorageError};
use crate::impls::InMemoryRecordStore;
use crate::ports::{FixedClock, RecordStore};

pub fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn day(n: i64) -> DateTime<Utc> {
    base() + Duration::days(n)
}

/// InMemoryRecordStore with injectable failures.
pub struct FaultyStore {
    pub inner: InMemoryRecordStore<FixedClock>,
    fail_queries: AtomicBool,
    race_first_match: AtomicBool,
    /// 1-based delete call that fails once with a StorageError (0 = never).
    fail_delete_on: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: InMemoryRecordStore::with_clock(FixedClock::new(now)),
            fail_queries: AtomicBool::new(false),
            race_first_match: AtomicBool::new(false),
            fail_delete_on: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    /// Remove the first matched record right after the query returns.
    pub fn race_first_match(&self) {
        self.race_first_match.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete_on_call(&self, call: usize) {
        self.fail_delete_on.store(call, Ordering::SeqCst);
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn find_expired(
        &self,
        filter: &ExpiryFilter,
    ) -> Result<Vec<ExpirableRecord>, StorageError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("connection refused".to_string()));
        }
        let records = self.inner.find_expired(filter).await?;
        if self.race_first_match.swap(false, Ordering::SeqCst)
            && let Some(first) = records.first()
        {
            let _ = self.inner.delete(first).await;
        }
        Ok(records)
    }

    async fn delete(&self, record: &ExpirableRecord) -> Result<(), DeleteError> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_delete_on.load(Ordering::SeqCst) == call {
            self.fail_delete_on.store(0, Ordering::SeqCst);
            return Err(StorageError::Unavailable("delete failed".to_string()).into());
        }
        self.inner.delete(record).await
    }

    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("connection refused".to_string()));
        }
        self.inner.current_time().await
    }
}
