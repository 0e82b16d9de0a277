use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::{CaptureRecord, Database},
    markdown::TaskStatus,
};

use super::paste::{clamp_to_char_boundary, classify, Insertion};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// A draft left in the background longer than this is captured on return.
pub const BACKGROUND_DWELL_SECS: i64 = 30;

/// The note currently being edited. Never persisted; finalizing turns it
/// into a `CaptureRecord` and resets it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    text: String,
    /// Byte offset into `text`, always on a char boundary.
    cursor: usize,
    last_background_at: Option<DateTime<Utc>>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn last_background_at(&self) -> Option<DateTime<Utc>> {
        self.last_background_at
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Replace the whole text, e.g. after an edit made directly in the editor.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.len();
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = clamp_to_char_boundary(&self.text, cursor);
    }

    pub fn type_text(&mut self, typed: &str) {
        self.insert_at_cursor(typed, typed.len());
    }

    /// Insert clipboard text after running it through the paste classifier.
    pub fn paste(&mut self, pasted: &str) -> Insertion {
        let insertion = classify(pasted, &self.text, self.cursor);
        self.insert_at_cursor(&insertion.text, insertion.cursor_offset);
        insertion
    }

    /// Insert an empty bold pair with the cursor between the markers.
    pub fn insert_bold(&mut self) {
        self.insert_at_cursor("****", 2);
    }

    pub fn insert_task_marker(&mut self, status: &TaskStatus) {
        let marker = status.line_marker();
        let len = marker.len();
        self.insert_at_cursor(&marker, len);
    }

    fn insert_at_cursor(&mut self, inserted: &str, cursor_offset: usize) {
        let at = clamp_to_char_boundary(&self.text, self.cursor);
        self.text.insert_str(at, inserted);
        self.cursor = clamp_to_char_boundary(&self.text, at + cursor_offset);
    }

    pub fn app_backgrounded(&mut self, now: DateTime<Utc>) {
        self.last_background_at = Some(now);
    }

    /// Capture the draft if the app spent longer than the dwell threshold in
    /// the background. The background timestamp is cleared either way.
    pub async fn app_foregrounded(
        &mut self,
        now: DateTime<Utc>,
        db: &Database,
    ) -> Result<Option<CaptureRecord>> {
        let Some(backgrounded_at) = self.last_background_at.take() else {
            return Ok(None);
        };

        let elapsed_ms = (now - backgrounded_at).num_milliseconds();
        if elapsed_ms > BACKGROUND_DWELL_SECS * 1000 {
            log_info!("Draft idle in background for {elapsed_ms}ms; finalizing");
            self.finalize(db).await
        } else {
            Ok(None)
        }
    }

    /// Persist the draft as a capture and reset it. Blank drafts are left as-is.
    ///
    /// If the store rejects the write the draft keeps its text.
    pub async fn finalize(&mut self, db: &Database) -> Result<Option<CaptureRecord>> {
        if self.is_blank() {
            return Ok(None);
        }

        let record = db.append_capture(&self.text, Utc::now()).await?;
        log_info!(
            "Captured note {} for {} ({} chars)",
            record.id,
            record.target_day,
            record.content.chars().count()
        );

        self.text.clear();
        self.cursor = 0;
        Ok(Some(record))
    }

    pub async fn start_new_note(&mut self, db: &Database) -> Result<Option<CaptureRecord>> {
        self.finalize(db).await
    }
}
