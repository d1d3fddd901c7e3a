//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 永続化層（SQL データベースなど）と時計への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod record_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::record_store::RecordStore;
