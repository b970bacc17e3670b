//! Plain-text presentation of the dashboard.

use taskmaster_atoms::tasks::{Task, TaskStatus};

use crate::controller::{Notice, NoticeKind};
use crate::session::Session;
use crate::view::{SortDirection, TaskView};

pub const EMPTY_STATE: &str =
    "No tasks yet!\nReady to get productive? Add your first task to get started.";

fn badge(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::ToDo => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
    }
}

pub fn task_card(task: &Task) -> String {
    let mut out = format!("{} {}  ({})", badge(task.status), task.title, task.status);
    if let Some(due) = task.due_date {
        out.push_str(&format!("  due {}", due.format("%b %-d, %Y")));
    }
    if let Some(description) = &task.description {
        out.push_str(&format!("\n    {}", description));
    }
    out.push_str(&format!("\n    id: {}", task.id));
    out
}

pub fn task_list(tasks: &[&Task]) -> String {
    if tasks.is_empty() {
        return EMPTY_STATE.to_string();
    }
    tasks
        .iter()
        .map(|task| task_card(task))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Account line plus the active filter and sort controls.
pub fn header(session: &Session, view: &TaskView) -> String {
    let account = match session.profile() {
        Some(user) => format!("{} <{}>", user.username, user.email),
        None => "signed in".to_string(),
    };
    let filters: Vec<&str> = view.filters().iter().map(TaskStatus::as_str).collect();
    let sort = match view.sort() {
        SortDirection::Ascending => "due date, soonest first",
        SortDirection::Descending => "due date, latest first",
    };
    format!(
        "Your Tasks - {}\nShowing: {} | Sorted by {}",
        account,
        if filters.is_empty() { "nothing".to_string() } else { filters.join(", ") },
        sort
    )
}

pub fn notice(notice: &Notice) -> String {
    let marker = match notice.kind {
        NoticeKind::Success => "ok",
        NoticeKind::Error => "error",
    };
    format!("{}: {} - {}", marker, notice.title, notice.description)
}
