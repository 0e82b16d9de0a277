use std::sync::OnceLock;

use regex::Regex;

use super::task_status::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine {
    pub status: TaskStatus,
    pub content: String,
}

fn task_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*-\s*\[([^\]]+)\]\s*(.*)$").expect("task line pattern is valid")
    })
}

/// Parse `- [c] content`. Lines without a bracketed marker are not tasks.
pub fn parse_task_line(line: &str) -> Option<TaskLine> {
    let captures = task_pattern().captures(line)?;
    let marker = captures.get(1)?.as_str();
    let content = captures.get(2).map_or("", |m| m.as_str());

    Some(TaskLine {
        status: TaskStatus::for_raw_value(marker),
        content: content.to_string(),
    })
}

/// Tasks in a note, in order, skipping non-task lines.
pub fn task_lines(note: &str) -> Vec<TaskLine> {
    note.lines().filter_map(parse_task_line).collect()
}
