//! Record identifiers.
//!
//! # 不透明な ID
//! ID は所有側のサブシステムが決めるもので、本サービスは中身を解釈しません。
//! 整数・UUID・ULID などをそのまま文字列として保持し、
//! delete 時に読み出した値のまま永続化層へ返します。
//!
//! 本サービス側で ID を発行する場合（InMemory ストアやテスト）は ULID を使います。
//! ULID 文字列は固定長で timestamp が先頭にあるため、文字列順 = 作成順になります。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// RecordId は期限付きレコードの ID（不透明な文字列キー）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// 作成時刻を timestamp 部分に持つ ULID の RecordId を生成
    ///
    /// epoch より前の時刻は 0 に丸めます。
    pub fn for_creation(created_at: DateTime<Utc>) -> Self {
        let timestamp_ms = created_at.timestamp_millis().max(0) as u64;
        Self::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }

    /// 永続化層に保存されている形のまま
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Ulid> for RecordId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }
}

impl From<String> for RecordId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for RecordId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(raw: i64) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}
