use serde::{Deserialize, Serialize};

/// Summary of one purge run.
///
/// Created fresh for every run and never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeResult {
    /// Records removed by this run.
    pub deleted_count: u64,

    /// Retention threshold used, in whole days.
    pub retention_days: i64,

    /// Records the expiry query returned.
    pub matched_count: u64,

    /// Matched records that were already gone when deleted.
    pub already_gone_count: u64,

    pub dry_run: bool,
}

impl PurgeResult {
    pub fn has_deletions(&self) -> bool {
        self.deleted_count > 0
    }
}
