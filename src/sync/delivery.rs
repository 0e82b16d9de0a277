//! Builds the `actions-uri` append URL for one day's batch of notes.

use crate::{capture::day::DayKey, settings::JournalSettings};

pub const APPEND_ACTION_URL: &str = "obsidian://actions-uri/note/append";

/// Separator placed between notes delivered in the same batch.
pub const NOTE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalTarget {
    pub vault: String,
    pub daily_folder: String,
    pub silent: bool,
}

impl From<&JournalSettings> for JournalTarget {
    fn from(settings: &JournalSettings) -> Self {
        Self {
            vault: settings.vault_name().to_string(),
            daily_folder: settings.daily_folder.clone(),
            silent: settings.silent,
        }
    }
}

impl JournalTarget {
    /// `<folder>/<YYYY-MM-DD>`, the daily note for `day`.
    pub fn journal_path(&self, day: DayKey) -> String {
        let folder = self.daily_folder.trim_matches('/');
        if folder.is_empty() {
            day.to_string()
        } else {
            format!("{folder}/{day}")
        }
    }

    pub fn append_url(&self, day: DayKey, payload: &str) -> String {
        let content = format!("\n{payload}");
        let query = [
            ("vault", self.vault.as_str()),
            ("file", self.journal_path(day).as_str()),
            ("content", content.as_str()),
            ("create-if-not-found", "true"),
            ("silent", if self.silent { "true" } else { "false" }),
        ]
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

        format!("{APPEND_ACTION_URL}?{query}")
    }
}

/// Join note contents, oldest first, separated by a blank line.
pub fn combine_payload<'a>(contents: impl IntoIterator<Item = &'a str>) -> String {
    contents.into_iter().collect::<Vec<_>>().join(NOTE_SEPARATOR)
}
