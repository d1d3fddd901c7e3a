use std::env;
use std::str::FromStr;

use lapse_core::domain::DEFAULT_RETENTION_DAYS;
use lapse_core::{PurgeConfig, RetentionPeriod};
use lapse_sqlite::{TableName, TableNameError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "LAPSE_LOG_FORMAT".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl LogFormat {
    /// Lenient read used before logging is up; unknown values fall back to text.
    pub fn from_env() -> Self {
        env::var("LAPSE_LOG_FORMAT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub table: TableName,
    pub retention_days: u32,
    pub interval_seconds: u64,
    pub record_label: String,
    pub dry_run: bool,
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
    #[error("{0} must be greater than zero")]
    Zero(String),
    #[error(transparent)]
    InvalidTable(#[from] TableNameError),
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let interval_seconds = parse_u64(&lookup, "LAPSE_INTERVAL_SECONDS", 3600)?;
        if interval_seconds == 0 {
            return Err(ConfigError::Zero("LAPSE_INTERVAL_SECONDS".to_string()));
        }

        let table = match lookup("LAPSE_TABLE") {
            Some(raw) => TableName::parse(&raw)?,
            None => TableName::default(),
        };

        let log_format = match lookup("LAPSE_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            database_url: lookup("LAPSE_DATABASE_URL")
                .ok_or_else(|| ConfigError::MissingVar("LAPSE_DATABASE_URL".to_string()))?,
            database_max_connections: parse_u32(&lookup, "LAPSE_DATABASE_MAX_CONNECTIONS", 5)?,
            table,
            retention_days: parse_u32(&lookup, "LAPSE_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
            interval_seconds,
            record_label: lookup("LAPSE_RECORD_LABEL").unwrap_or_else(|| "session".to_string()),
            dry_run: parse_bool(&lookup, "LAPSE_DRY_RUN", false)?,
            log_format,
        })
    }

    pub fn purge_config(&self) -> PurgeConfig {
        PurgeConfig {
            retention: RetentionPeriod::from_days(self.retention_days),
            dry_run: self.dry_run,
        }
    }
}

fn parse_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u32,
) -> Result<u32, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        },
        None => Ok(default),
    }
}
