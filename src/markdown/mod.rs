pub mod task_line;
pub mod task_status;

pub use task_line::{parse_task_line, task_lines, TaskLine};
pub use task_status::TaskStatus;
