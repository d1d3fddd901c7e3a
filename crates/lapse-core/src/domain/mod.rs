//! Domain model (ids, records, retention, results, errors).

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;
pub mod retention;

pub use errors::{DeleteError, PurgeError, StorageError};
pub use ids::RecordId;
pub use record::ExpirableRecord;
pub use result::PurgeResult;
pub use retention::{DEFAULT_RETENTION_DAYS, ExpiryFilter, RetentionPeriod};
