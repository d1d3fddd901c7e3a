//! SqliteRecordStore - SQLite による RecordStore 実装
//!
//! # スキーマ
//! ```sql
//! CREATE TABLE "<table>" (id TEXT PRIMARY KEY NOT NULL, created_at_ms INTEGER NOT NULL);
//! ```
//! 時刻は unix epoch からのミリ秒で保存します。しきい値は常に bind します。
//!
//! id は所有側が決めた値をそのまま扱います（TEXT / INTEGER のどちらの列でもよい）。
//! 読み出しは `CAST(id AS TEXT)`、削除は読み出した文字列を bind し、
//! 比較時に列の型親和性で元の型に戻ります。

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lapse_core::{
    DeleteError, ExpirableRecord, ExpiryFilter, RecordId, RecordStore, StorageError,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::debug;

use crate::table::TableName;

/// Row-level decode failures.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("record {id} has out-of-range created_at_ms {ms}")]
    InvalidTimestamp { id: RecordId, ms: i64 },
}

fn storage_error(err: sqlx::Error) -> StorageError {
    if matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    ) {
        StorageError::Unavailable(err.to_string())
    } else {
        StorageError::backend(err)
    }
}

/// Smallest whole millisecond not before `cutoff`.
///
/// Stored times are whole milliseconds, so `created_at_ms < ceil(cutoff)` is
/// exactly `created_at < cutoff`.
fn cutoff_ms(cutoff: DateTime<Utc>) -> i64 {
    let floor = cutoff.timestamp_millis();
    if cutoff.timestamp_subsec_nanos() % 1_000_000 == 0 {
        floor
    } else {
        floor.saturating_add(1)
    }
}

/// Statements are rendered once per table.
#[derive(Debug, Clone)]
struct Statements {
    find_expired: String,
    delete: String,
    insert: String,
    count: String,
}

impl Statements {
    fn for_table(table: &TableName) -> Self {
        let t = table.quoted();
        Self {
            find_expired: format!(
                "SELECT CAST(id AS TEXT) AS id, created_at_ms FROM {t} WHERE created_at_ms < ? ORDER BY created_at_ms"
            ),
            delete: format!("DELETE FROM {t} WHERE id = ?"),
            insert: format!("INSERT INTO {t} (id, created_at_ms) VALUES (?, ?)"),
            count: format!("SELECT COUNT(*) AS n FROM {t}"),
        }
    }
}

pub struct SqliteRecordStore {
    pool: SqlitePool,
    table: TableName,
    statements: Statements,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool, table: TableName) -> Self {
        let statements = Statements::for_table(&table);
        Self {
            pool,
            table,
            statements,
        }
    }

    /// Open a pool for `url`, creating the database file if missing.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        table: TableName,
    ) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(storage_error)?;
        Ok(Self::new(pool, table))
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the table and its `created_at_ms` index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let t = self.table.quoted();
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {t} (id TEXT PRIMARY KEY NOT NULL, created_at_ms INTEGER NOT NULL)"
        ))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {t} (created_at_ms)",
            self.table.index_name("created_at_ms")
        ))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        debug!(table = %self.table, "schema ready");
        Ok(())
    }

    pub async fn insert(&self, record: &ExpirableRecord) -> Result<(), StorageError> {
        sqlx::query(&self.statements.insert)
            .bind(record.id.as_str())
            .bind(record.created_at.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, StorageError> {
        let row = sqlx::query(&self.statements.count)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        let n: i64 = row.try_get("n").map_err(storage_error)?;
        Ok(n.max(0) as u64)
    }

    fn decode(row: &SqliteRow) -> Result<ExpirableRecord, StorageError> {
        let raw_id: String = row.try_get("id").map_err(storage_error)?;
        let ms: i64 = row.try_get("created_at_ms").map_err(storage_error)?;
        let id = RecordId::from(raw_id);
        let created_at = DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| StorageError::backend(RowError::InvalidTimestamp { id: id.clone(), ms }))?;
        Ok(ExpirableRecord::new(id, created_at))
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_expired(
        &self,
        filter: &ExpiryFilter,
    ) -> Result<Vec<ExpirableRecord>, StorageError> {
        let Some(cutoff) = filter.cutoff() else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(&self.statements.find_expired)
            .bind(cutoff_ms(cutoff))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        rows.iter().map(Self::decode).collect()
    }

    async fn delete(&self, record: &ExpirableRecord) -> Result<(), DeleteError> {
        let result = sqlx::query(&self.statements.delete)
            .bind(record.id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(DeleteError::NotFound(record.id.clone()));
        }
        Ok(())
    }

    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError> {
        let row = sqlx::query(
            "SELECT CAST(ROUND((julianday('now') - 2440587.5) * 86400000.0) AS INTEGER) AS now_ms",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        let ms: i64 = row.try_get("now_ms").map_err(storage_error)?;
        DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| StorageError::Unavailable(format!("store clock out of range: {ms}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use lapse_core::{PurgeConfig, PurgeError, PurgeService, RetentionPeriod};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    async fn memory_store() -> SqliteRecordStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteRecordStore::new(pool, TableName::default());
        store.ensure_schema().await.unwrap();
        store
    }

    async fn seed(store: &SqliteRecordStore, created_at: DateTime<Utc>) -> ExpirableRecord {
        let record = ExpirableRecord::created(created_at);
        store.insert(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn find_expired_uses_strict_cutoff() {
        let store = memory_store().await;
        let old = seed(&store, day(0)).await;
        seed(&store, day(3)).await;
        seed(&store, day(9)).await;

        let filter = ExpiryFilter::new(day(10), RetentionPeriod::from_days(7));
        let expired = store.find_expired(&filter).await.unwrap();

        assert_eq!(expired, vec![old]);
    }

    #[tokio::test]
    async fn find_expired_orders_by_creation() {
        let store = memory_store().await;
        let b = seed(&store, day(2)).await;
        let a = seed(&store, day(1)).await;

        let filter = ExpiryFilter::new(day(10), RetentionPeriod::from_days(0));
        let expired = store.find_expired(&filter).await.unwrap();

        assert_eq!(expired, vec![a, b]);
    }

    #[tokio::test]
    async fn overflowing_cutoff_matches_nothing() {
        let store = memory_store().await;
        seed(&store, day(0)).await;
        let filter = ExpiryFilter::new(day(10), RetentionPeriod::from_days(u32::MAX));
        assert!(store.find_expired(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_record_is_not_found() {
        let store = memory_store().await;
        let record = seed(&store, day(0)).await;

        store.delete(&record).await.unwrap();
        let err = store.delete(&record).await.unwrap_err();

        assert!(matches!(err, DeleteError::NotFound(ref id) if *id == record.id));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn current_time_tracks_wall_clock() {
        let store = memory_store().await;
        let store_now = store.current_time().await.unwrap();
        let skew = (Utc::now() - store_now).num_seconds().abs();
        assert!(skew < 5, "store clock skew {skew}s");
    }

    #[tokio::test]
    async fn closed_pool_is_unavailable() {
        let store = memory_store().await;
        store.pool().close().await;
        let filter = ExpiryFilter::new(day(10), RetentionPeriod::default());
        let err = store.find_expired(&filter).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[tokio::test]
    async fn corrupt_timestamp_is_a_backend_error() {
        let store = memory_store().await;
        sqlx::query("INSERT INTO \"sessions\" (id, created_at_ms) VALUES (?, ?)")
            .bind(RecordId::for_creation(day(0)).as_str())
            .bind(i64::MIN)
            .execute(store.pool())
            .await
            .unwrap();

        let filter = ExpiryFilter::new(day(10), RetentionPeriod::default());
        let err = store.find_expired(&filter).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }

    #[tokio::test]
    async fn purge_service_over_sqlite() {
        let store = memory_store().await;
        seed(&store, day(0)).await;
        seed(&store, day(3)).await;
        seed(&store, day(9)).await;
        let service = PurgeService::new(store, PurgeConfig::with_retention(RetentionPeriod::from_days(7)));

        let first = service.run(day(10)).await.unwrap();
        let second = service.run(day(10)).await.unwrap();

        assert_eq!(first.deleted_count, 1);
        assert_eq!(second.deleted_count, 0);
        assert_eq!(service.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn purge_service_surfaces_storage_failure() {
        let store = memory_store().await;
        seed(&store, day(0)).await;
        store.pool().close().await;
        let service = PurgeService::new(store, PurgeConfig::default());

        let err = service.run(day(10)).await.unwrap_err();
        assert!(matches!(err, PurgeError::Query(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn custom_table_name() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteRecordStore::new(pool, TableName::parse("multi_form_session").unwrap());
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
        seed(&store, day(0)).await;
        assert_eq!(store.table().as_str(), "multi_form_session");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn foreign_ids_are_purged_as_stored() {
        let store = memory_store().await;
        let ulid_record = seed(&store, day(0)).await;
        for (raw, created) in [("42", day(1)), ("6f1c1c52-8d3e-4c2a-9a57-0d4b1e0f3a11", day(2))] {
            store
                .insert(&ExpirableRecord::new(RecordId::new(raw), created))
                .await
                .unwrap();
        }
        seed(&store, day(9)).await;
        let service = PurgeService::new(store, PurgeConfig::with_retention(RetentionPeriod::from_days(7)));

        let result = service.run(day(10)).await.unwrap();

        assert_eq!(result.deleted_count, 3);
        assert_eq!(service.store().count().await.unwrap(), 1);
        let filter = ExpiryFilter::new(day(10), RetentionPeriod::from_days(0));
        let left = service.store().find_expired(&filter).await.unwrap();
        assert!(left.iter().all(|r| r.id != ulid_record.id));
    }

    #[tokio::test]
    async fn integer_keyed_table_is_supported() {
        let store = memory_store().await;
        sqlx::query("CREATE TABLE \"legacy\" (id INTEGER PRIMARY KEY, created_at_ms INTEGER NOT NULL)")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO \"legacy\" (id, created_at_ms) VALUES (42, ?), (43, ?)")
            .bind(day(0).timestamp_millis())
            .bind(day(9).timestamp_millis())
            .execute(store.pool())
            .await
            .unwrap();
        let legacy = SqliteRecordStore::new(store.pool().clone(), TableName::parse("legacy").unwrap());

        let filter = ExpiryFilter::new(day(10), RetentionPeriod::from_days(7));
        let expired = legacy.find_expired(&filter).await.unwrap();
        assert_eq!(expired, vec![ExpirableRecord::new(RecordId::from(42_i64), day(0))]);

        legacy.delete(&expired[0]).await.unwrap();
        assert_eq!(legacy.count().await.unwrap(), 1);
        assert!(matches!(
            legacy.delete(&expired[0]).await,
            Err(DeleteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn sub_millisecond_cutoff_agrees_with_filter() {
        let store = memory_store().await;
        seed(&store, day(3)).await;
        let now = day(10) + Duration::microseconds(500);
        let filter = ExpiryFilter::new(now, RetentionPeriod::from_days(7));
        assert!(filter.is_expired(day(3)));

        let service = PurgeService::new(store, PurgeConfig::with_retention(RetentionPeriod::from_days(7)));
        let result = service.run(now).await.unwrap();

        assert_eq!(result.deleted_count, 1);
    }

    #[tokio::test]
    async fn record_one_millisecond_inside_subms_cutoff_is_kept() {
        let store = memory_store().await;
        let created = day(3) + Duration::milliseconds(1);
        seed(&store, created).await;
        let now = day(10) + Duration::microseconds(500);
        let filter = ExpiryFilter::new(now, RetentionPeriod::from_days(7));
        assert!(!filter.is_expired(created));

        assert!(store.find_expired(&filter).await.unwrap().is_empty());
    }

    #[rstest::rstest]
    #[case::whole_ms(Duration::milliseconds(5), 5)]
    #[case::half_ms(Duration::microseconds(5_500), 6)]
    #[case::one_ns(Duration::nanoseconds(1), 1)]
    #[case::before_epoch(Duration::microseconds(-1_500), -1)]
    fn cutoff_rounds_up_to_whole_millisecond(#[case] offset: Duration, #[case] expected: i64) {
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(cutoff_ms(epoch + offset), expected);
    }
}
