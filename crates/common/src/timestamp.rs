//! UTC instants as they appear on evidence records, window scopes and
//! export file names.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC instant. Serializes as RFC 3339 so exports stay sortable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(dt)
    }

    /// Start of an evidence window reaching `days` back from this instant.
    /// Saturates at the earliest representable instant.
    pub fn days_before(&self, days: u32) -> Self {
        let back = Duration::days(i64::from(days));
        Timestamp(self.0.checked_sub_signed(back).unwrap_or(DateTime::<Utc>::MIN_UTC))
    }

    /// `2024-01-01`, used in window scopes.
    pub fn to_date(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// `20240101-093000`, used in export file names.
    pub fn to_file_stamp(&self) -> String {
        self.0.format("%Y%m%d-%H%M%S").to_string()
    }

    /// Console form, second precision.
    pub fn to_display(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
