//! Captured note records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::day::DayKey;

/// A finalized note waiting to be, or already, appended to its daily journal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecord {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub target_day: DayKey,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
}
