//! Validated SQL table identifiers.
//!
//! Table names cannot be bound as parameters, so they are restricted to
//! `[A-Za-z_][A-Za-z0-9_]*` and always emitted quoted.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableNameError {
    #[error("table name is empty")]
    Empty,

    #[error("table name is {0} characters, max is 64")]
    TooLong(usize),

    #[error("table name '{name}' contains invalid character {ch:?}")]
    InvalidChar { name: String, ch: char },

    #[error("table name '{0}' must not start with a digit")]
    LeadingDigit(String),
}

impl TableName {
    pub fn parse(raw: &str) -> Result<Self, TableNameError> {
        if raw.is_empty() {
            return Err(TableNameError::Empty);
        }
        if raw.len() > MAX_LEN {
            return Err(TableNameError::TooLong(raw.len()));
        }
        if let Some(ch) = raw.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(TableNameError::InvalidChar {
                name: raw.to_string(),
                ch,
            });
        }
        if raw.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(TableNameError::LeadingDigit(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for use in SQL text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    pub(crate) fn index_name(&self, column: &str) -> String {
        format!("\"{}_{}_idx\"", self.0, column)
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self("sessions".to_string())
    }
}

impl FromStr for TableName {
    type Err = TableNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
