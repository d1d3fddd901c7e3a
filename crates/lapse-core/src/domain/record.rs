//! Expirable records as seen by the purge service.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RecordId;

/// A persisted record that becomes eligible for purge once it is older than
/// the retention period.
///
/// Created and mutated by the owning subsystem; the purge service only reads
/// `created_at` and issues deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirableRecord {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
}

impl ExpirableRecord {
    pub fn new(id: RecordId, created_at: DateTime<Utc>) -> Self {
        Self { id, created_at }
    }

    /// Record with an id minted from its creation time.
    pub fn created(created_at: DateTime<Utc>) -> Self {
        Self::new(RecordId::for_creation(created_at), created_at)
    }

    /// Elapsed time between creation and `now`. Negative for records created
    /// after `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
    }
}
