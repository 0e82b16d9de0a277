//! Calendar-day bucketing for captured notes.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day with the time-of-day discarded.
///
/// Ordered chronologically, so a `BTreeMap<DayKey, _>` walks days oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Parse the `YYYY-MM-DD` form produced by `Display`.
    pub fn parse(value: &str) -> Result<Self> {
        NaiveDate::parse_from_str(value, DAY_FORMAT)
            .map(Self)
            .with_context(|| format!("invalid day key '{value}'"))
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

/// Bucket a timestamp into the calendar day of its own timezone.
pub fn bucket<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> DayKey {
    DayKey(timestamp.date_naive())
}

/// Bucket a UTC instant into the host's local calendar day.
pub fn bucket_local(timestamp: DateTime<Utc>) -> DayKey {
    bucket(&timestamp.with_timezone(&Local))
}
