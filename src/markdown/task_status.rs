//! Task status markers understood by the journal's task plugin.
//!
//! A task line looks like `- [c] text`, where `c` selects the status.

use serde::Serialize;

pub const FALLBACK_SYMBOL: &str = "questionmark.square.dashed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// Marker character(s) placed between the brackets.
    pub id: String,
    pub symbol: Option<String>,
    pub display_name: String,
}

struct KnownStatus {
    id: &'static str,
    symbol: Option<&'static str>,
    display_name: &'static str,
}

const fn known(id: &'static str, symbol: Option<&'static str>, display_name: &'static str) -> KnownStatus {
    KnownStatus {
        id,
        symbol,
        display_name,
    }
}

const KNOWN: &[KnownStatus] = &[
    known(" ", Some("circle"), "Task"),
    known("/", Some("circle.lefthalf.fill"), "Partially Done"),
    known("x", Some("checkmark.circle.fill"), "Done"),
    known("i", Some("info.circle"), "Information"),
    known("!", Some("exclamationmark.triangle"), "Alert"),
    known("I", Some("lightbulb.fill"), "Idea"),
    known("?", Some("questionmark.circle"), "Question"),
    known("b", Some("bookmark.fill"), "Bookmark"),
    known(">", Some("paperplane.fill"), "Moved"),
    known("<", Some("calendar"), "Event"),
    known("*", None, "Important"),
    known("\"", Some("quote.bubble.fill"), "Quotation"),
    known("p", Some("hand.thumbsup.fill"), "Thumbs Up"),
    known("c", Some("hand.thumbsdown.fill"), "Thumbs Down"),
    known("u", Some("arrow.up"), "Up trend"),
    known("d", Some("arrow.down"), "Down trend"),
    known("f", Some("flame.fill"), "Fire"),
    known("k", Some("key.fill"), "Key"),
    known("l", Some("mappin.and.ellipse"), "Location"),
    known("S", Some("dollarsign.circle.fill"), "Savings/Spend"),
    known("w", Some("trophy.fill"), "Win"),
];

impl From<&KnownStatus> for TaskStatus {
    fn from(status: &KnownStatus) -> Self {
        Self {
            id: status.id.to_string(),
            symbol: status.symbol.map(str::to_string),
            display_name: status.display_name.to_string(),
        }
    }
}

impl TaskStatus {
    /// Every status with a dedicated meaning, open task first.
    pub fn known() -> Vec<TaskStatus> {
        KNOWN.iter().map(TaskStatus::from).collect()
    }

    pub fn open() -> TaskStatus {
        Self::for_raw_value(" ")
    }

    /// Look up a marker; unknown markers get a bare status named after themselves.
    pub fn for_raw_value(raw: &str) -> TaskStatus {
        KNOWN
            .iter()
            .find(|status| status.id == raw)
            .map(TaskStatus::from)
            .unwrap_or_else(|| TaskStatus {
                id: raw.to_string(),
                symbol: None,
                display_name: raw.to_string(),
            })
    }

    pub fn fallback_symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or(FALLBACK_SYMBOL)
    }

    /// `- [c] `, ready to be followed by task text.
    pub fn line_marker(&self) -> String {
        format!("- [{}] ", self.id)
    }
}
