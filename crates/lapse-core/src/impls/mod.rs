//! Impls - 実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryRecordStore**: 開発・テスト用の永続化層
//!
//! # 本番用実装
//! 本番用の実装は別クレートに配置します：
//! - `lapse-sqlite`: SqliteRecordStore

pub mod inmem_store;

pub use self::inmem_store::InMemoryRecordStore;
