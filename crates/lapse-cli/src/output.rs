use chrono::{DateTime, Utc};
use lapse_core::PurgeResult;
use serde::Serialize;

/// Machine-readable form of a run, printed with `--json`.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    #[serde(flatten)]
    pub result: PurgeResult,
    pub label: &'a str,
    pub as_of: Option<DateTime<Utc>>,
}

pub fn summary_line(result: &PurgeResult, label: &str) -> String {
    if result.dry_run {
        return format!(
            "DRY RUN: {} {} records would be deleted that were older than {} days.",
            result.matched_count, label, result.retention_days
        );
    }
    format!(
        "{} {} records deleted that were older than {} days.",
        result.deleted_count, label, result.retention_days
    )
}
