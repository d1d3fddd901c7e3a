//! lapse-core
//!
//! Core building blocks for purging expired records.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, record, retention, result, errors）
//! - **ports**: 抽象化レイヤー（RecordStore, Clock）
//! - **app**: アプリケーションロジック（PurgeService, PurgeLoop）
//! - **impls**: 実装（InMemoryRecordStore など開発用）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{LoopStats, PurgeConfig, PurgeLoop, PurgeService};
pub use domain::{
    DeleteError, ExpirableRecord, ExpiryFilter, PurgeError, PurgeResult, RecordId,
    RetentionPeriod, StorageError,
};
pub use ports::{Clock, FixedClock, RecordStore, SystemClock};
