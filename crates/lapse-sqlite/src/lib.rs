//! lapse-sqlite
//!
//! SQLite implementation of the `RecordStore` port.

pub mod store;
pub mod table;

pub use store::{RowError, SqliteRecordStore};
pub use table::{TableName, TableNameError};
