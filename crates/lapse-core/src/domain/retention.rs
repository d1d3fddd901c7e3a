//! Retention - 保持期間と期限切れ判定
//!
//! 永続化層へは文字列 SQL ではなく `ExpiryFilter` を渡します。
//! しきい値は常にパラメータとして扱われます。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default retention in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// RetentionPeriod はレコードが purge 対象になるまでの期間
///
/// 0 や負の値も受け付けます。0 の場合、age > 0 のレコードはすべて対象になります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RetentionPeriod(#[serde(with = "duration_secs")] Duration);

impl RetentionPeriod {
    pub fn from_days(days: u32) -> Self {
        Self(Duration::days(i64::from(days)))
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// 結果やログに出す日数（端数は切り捨て）
    pub fn whole_days(&self) -> i64 {
        self.0.num_days()
    }
}

impl Default for RetentionPeriod {
    fn default() -> Self {
        Self::from_days(DEFAULT_RETENTION_DAYS)
    }
}

/// ExpiryFilter は「age(record) > retention」を表す型付きフィルタ
///
/// # 境界
/// - age == retention のレコードは残す（`>` であって `>=` ではない）
/// - `created_at < now - retention` と同値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryFilter {
    pub now: DateTime<Utc>,
    pub retention: RetentionPeriod,
}

impl ExpiryFilter {
    pub fn new(now: DateTime<Utc>, retention: RetentionPeriod) -> Self {
        Self { now, retention }
    }

    /// これより前に作成されたレコードが期限切れ
    ///
    /// 暦の範囲を超える場合は `None`（期限切れのレコードは存在しない）。
    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.now.checked_sub_signed(self.retention.as_duration())
    }

    pub fn is_expired(&self, created_at: DateTime<Utc>) -> bool {
        self.cutoff().is_some_and(|cutoff| created_at < cutoff)
    }
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom(format!("retention out of range: {secs}s")))
    }
}
