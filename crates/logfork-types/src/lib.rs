//! Shared types for logfork
//!
//! This crate contains data structures used across multiple logfork crates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

// ============================================================================
// Log Types
// ============================================================================

/// Number of positional fields in a Common Log Format line
pub const CLF_FIELD_COUNT: usize = 10;

/// One access-log line split into its Common Log Format fields.
///
/// Every field is kept as text; a short or malformed line simply leaves the
/// trailing fields empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub remote_host: String,
    pub rfc931: String,
    pub auth_user: String,
    /// `17/May/2015:10:05:03` (brackets stripped)
    pub datetime: String,
    /// `+0000`
    pub timezone: String,
    pub method: String,
    pub pathname: String,
    pub protocol: String,
    pub status: String,
    pub bytes: String,
}

impl LogRecord {
    /// Build a record from positional tokens, padding missing ones with empty strings
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fields: [String; CLF_FIELD_COUNT] = Default::default();
        for (slot, token) in fields.iter_mut().zip(tokens) {
            *slot = token.to_string();
        }

        let [
            remote_host,
            rfc931,
            auth_user,
            datetime,
            timezone,
            method,
            pathname,
            protocol,
            status,
            bytes,
        ] = fields;

        Self {
            remote_host,
            rfc931,
            auth_user,
            datetime,
            timezone,
            method,
            pathname,
            protocol,
            status,
            bytes,
        }
    }

    /// Date portion of `datetime` (everything before the first `:`)
    pub fn date(&self) -> &str {
        self.datetime
            .split_once(':')
            .map_or(self.datetime.as_str(), |(date, _)| date)
    }

    /// Parsed request time, if `datetime` and `timezone` are well formed
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if self.datetime.is_empty() || self.timezone.is_empty() {
            return None;
        }
        let text = format!("{} {}", self.datetime, self.timezone);
        DateTime::parse_from_str(&text, "%d/%b/%Y:%H:%M:%S %z")
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

// ============================================================================
// Query State Types
// ============================================================================

/// Accumulator of the daily-average reducer
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyAverageState {
    /// Date of the most recent non-blank line
    pub last_date: Option<String>,

    /// One bucket per observed day; never empty
    pub counts: Vec<u64>,

    /// Mean of `counts`
    pub average: f64,
}

impl Default for DailyAverageState {
    fn default() -> Self {
        Self {
            last_date: None,
            counts: vec![0],
            average: 0.0,
        }
    }
}

// ============================================================================
// Report Types
// ============================================================================

/// Value produced by one registered query
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryValue {
    /// Number of lines that satisfied a predicate
    Count { count: u64 },
    /// Daily-average reducer output
    Average { average: f64, counts: Vec<u64> },
    /// The observer stopped before producing a value
    Failed { reason: String },
}

impl QueryValue {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count { count } => write!(f, "{count}"),
            Self::Average { average, .. } => write!(f, "{average}"),
            Self::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/// A labelled query result handed to a sink
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryReport {
    /// Human-readable question this query answers
    pub label: String,

    /// Lines this observer processed when the report was taken
    pub lines_seen: u64,

    pub value: QueryValue,
}

impl QueryReport {
    pub fn new(label: impl Into<String>, lines_seen: u64, value: QueryValue) -> Self {
        Self {
            label: label.into(),
            lines_seen,
            value,
        }
    }
}
