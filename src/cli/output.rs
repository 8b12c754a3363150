use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::model::task::{ActivityEntry, Priority, Subtask, Task};
use crate::model::user::User;
use crate::ops::view::View;
use crate::util::unicode::{fit_to_width, single_line};

/// Shown IDs are shortened to this many characters
pub const SHORT_ID_LEN: usize = 8;

/// Entries shown in the activity section of `show`
pub const RECENT_ACTIVITY: usize = 5;

const TITLE_WIDTH: usize = 40;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    pub overdue: bool,
    pub created_at: DateTime<Utc>,
    pub subtasks: Vec<SubtaskJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activity: Vec<ActivityJson>,
}

#[derive(Serialize)]
pub struct SubtaskJson {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

#[derive(Serialize)]
pub struct ActivityJson {
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ListJson {
    pub tasks: Vec<TaskJson>,
    pub shown: usize,
    pub total: usize,
    pub can_reorder: bool,
}

#[derive(Serialize)]
pub struct UserJson {
    pub id: String,
    pub email: String,
    pub logged_in_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct HistoryJson {
    pub undo: usize,
    pub redo: usize,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// `with_activity` adds the full activity log
pub fn task_to_json(task: &Task, now: DateTime<Utc>, with_activity: bool) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        completed: task.completed,
        priority: task.priority,
        tags: task.tags.clone(),
        due: task.due,
        overdue: task.is_overdue(now),
        created_at: task.created_at,
        subtasks: task.subtasks.iter().map(subtask_to_json).collect(),
        activity: if with_activity {
            task.activity.iter().map(activity_to_json).collect()
        } else {
            Vec::new()
        },
    }
}

pub fn subtask_to_json(sub: &Subtask) -> SubtaskJson {
    SubtaskJson {
        id: sub.id.clone(),
        title: sub.title.clone(),
        completed: sub.completed,
    }
}

fn activity_to_json(entry: &ActivityEntry) -> ActivityJson {
    ActivityJson {
        action: entry.action.clone(),
        timestamp: entry.timestamp,
    }
}

pub fn view_to_json(view: &View, now: DateTime<Utc>) -> ListJson {
    ListJson {
        tasks: view.tasks.iter().map(|t| task_to_json(t, now, false)).collect(),
        shown: view.tasks.len(),
        total: view.total,
        can_reorder: view.can_reorder,
    }
}

pub fn user_to_json(user: &User) -> UserJson {
    UserJson {
        id: user.id.clone(),
        email: user.email.clone(),
        logged_in_at: user.logged_in_at,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

pub fn short_id(id: &str) -> &str {
    id.char_indices()
        .nth(SHORT_ID_LEN)
        .map_or(id, |(end, _)| &id[..end])
}

fn check(completed: bool) -> char {
    if completed { 'x' } else { ' ' }
}

fn local_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One row of `list`: `[x] 1a2b3c4d  title  high  due 2026-03-12!  1/3  #tags`
pub fn format_task_line(task: &Task, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "[{}] {}  {}  {:<6}",
        check(task.completed),
        short_id(&task.id),
        fit_to_width(&single_line(&task.title), TITLE_WIDTH),
        task.priority.as_str(),
    );
    if let Some(due) = task.due {
        let marker = if task.is_overdue(now) { "!" } else { "" };
        line.push_str(&format!("  due {}{}", local_date(due), marker));
    }
    let (done, total) = task.subtask_progress();
    if total > 0 {
        line.push_str(&format!("  {}/{}", done, total));
    }
    if !task.tags.is_empty() {
        line.push_str("  ");
        line.push_str(&format_tags(&task.tags));
    }
    line.trim_end().to_string()
}

pub fn format_list(view: &View, now: DateTime<Utc>) -> Vec<String> {
    let mut lines: Vec<String> = view.tasks.iter().map(|t| format_task_line(t, now)).collect();
    if view.tasks.is_empty() {
        lines.push(if view.total == 0 {
            "No tasks yet.".to_string()
        } else {
            "No tasks match the current filters.".to_string()
        });
    }
    lines.push(format!("{} of {} tasks", view.tasks.len(), view.total));
    lines
}

/// Detailed task view
pub fn format_task_detail(task: &Task, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![
        format!("[{}] {}", check(task.completed), task.title),
        format!("id:       {}", task.id),
        format!("priority: {}", task.priority),
    ];
    if let Some(due) = task.due {
        let overdue = if task.is_overdue(now) { " (overdue)" } else { "" };
        lines.push(format!("due:      {}{}", local_date(due), overdue));
    }
    if !task.tags.is_empty() {
        lines.push(format!("tags:     {}", format_tags(&task.tags)));
    }
    lines.push(format!("created:  {}", local_time(task.created_at)));

    if !task.description.is_empty() {
        lines.push(String::new());
        lines.extend(task.description.lines().map(|l| format!("  {}", l)));
    }

    if !task.subtasks.is_empty() {
        let (done, total) = task.subtask_progress();
        lines.push(String::new());
        lines.push(format!("subtasks ({}/{}):", done, total));
        for sub in &task.subtasks {
            lines.push(format!(
                "  [{}] {}  {}",
                check(sub.completed),
                short_id(&sub.id),
                sub.title
            ));
        }
    }

    if !task.activity.is_empty() {
        lines.push(String::new());
        lines.push("activity:".to_string());
        for entry in task.activity.iter().rev().take(RECENT_ACTIVITY) {
            lines.push(format!("  {}  {}", local_time(entry.timestamp), entry.action));
        }
    }
    lines
}
