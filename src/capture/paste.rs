//! Smart paste: decides how clipboard text lands in the draft.
//!
//! Links become `[](url)` with the cursor inside the label, short single-line
//! fragments become open tasks, and anything long or multi-line is inserted
//! untouched.

use serde::Serialize;
use url::Url;

/// Pastes longer than this many characters are inserted verbatim.
pub const BULK_PASTE_THRESHOLD: usize = 100;

pub const OPEN_TASK_MARKER: &str = "- [ ]";
const OPEN_TASK_PREFIX: &str = "- [ ] ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PasteKind {
    Link,
    Bulk,
    /// Promoted to an open task.
    Task,
    /// Inserted unchanged onto a line that already carries a task marker.
    Plain,
}

/// What to insert at the cursor and where the cursor ends up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insertion {
    pub kind: PasteKind,
    pub text: String,
    /// Byte offset from the start of `text`.
    pub cursor_offset: usize,
}

impl Insertion {
    fn cursor_at_end(kind: PasteKind, text: String) -> Self {
        let cursor_offset = text.len();
        Self {
            kind,
            text,
            cursor_offset,
        }
    }
}

/// Classify `pasted` for insertion into `text` at byte offset `cursor`.
pub fn classify(pasted: &str, text: &str, cursor: usize) -> Insertion {
    let trimmed = pasted.trim();

    if is_web_link(trimmed) {
        return Insertion {
            kind: PasteKind::Link,
            text: format!("[]({trimmed})"),
            cursor_offset: 1,
        };
    }

    if trimmed.contains('\n') || trimmed.chars().count() > BULK_PASTE_THRESHOLD {
        return Insertion::cursor_at_end(PasteKind::Bulk, pasted.to_string());
    }

    if line_prefix(text, cursor).trim().starts_with(OPEN_TASK_MARKER) {
        Insertion::cursor_at_end(PasteKind::Plain, pasted.to_string())
    } else {
        Insertion::cursor_at_end(PasteKind::Task, format!("{OPEN_TASK_PREFIX}{pasted}"))
    }
}

fn is_web_link(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Text between the start of the cursor's line and the cursor.
fn line_prefix(text: &str, cursor: usize) -> &str {
    let before = &text[..clamp_to_char_boundary(text, cursor)];
    let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
    &before[line_start..]
}

/// Largest char boundary in `text` that is `<= offset`.
pub(crate) fn clamp_to_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
