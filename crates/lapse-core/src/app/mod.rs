//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **PurgeService**: 期限切れレコードの検索と削除（1 回分）
//! - **PurgeLoop**: PurgeService を一定間隔で実行する in-process scheduler

pub mod purge;
pub mod purge_loop;

#[cfg(test)]
mod test_support;

pub use self::purge::{PurgeConfig, PurgeService};
pub use self::purge_loop::{LoopStats, PurgeLoop};
