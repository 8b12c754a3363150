use crate::model::task::{Subtask, Task, TaskDraft, TaskPatch};

// Every edit here is pure: it reads the current collection and returns the
// next one, or `None` when the collection is unchanged. The store decides
// what to do with history and persistence.

// ---------------------------------------------------------------------------
// Task CRUD
// ---------------------------------------------------------------------------

/// Append a new task built from `draft`. Returns the new collection and the
/// assigned ID.
pub fn add_task(tasks: &[Task], draft: TaskDraft) -> (Vec<Task>, String) {
    let task = Task::from_draft(draft);
    let id = task.id.clone();
    let mut next = Vec::with_capacity(tasks.len() + 1);
    next.extend_from_slice(tasks);
    next.push(task);
    (next, id)
}

/// Shallow-merge `patch` onto the task and log "Task updated".
pub fn update_task(tasks: &[Task], id: &str, patch: TaskPatch) -> Option<Vec<Task>> {
    edit_task(tasks, id, |task| {
        patch.apply(task);
        task.log("Task updated");
        true
    })
}

pub fn delete_task(tasks: &[Task], id: &str) -> Option<Vec<Task>> {
    find_index(tasks, id)?;
    Some(tasks.iter().filter(|t| t.id != id).cloned().collect())
}

/// Flip the completion flag and log the new state
pub fn toggle_complete(tasks: &[Task], id: &str) -> Option<Vec<Task>> {
    edit_task(tasks, id, |task| {
        task.completed = !task.completed;
        task.log(if task.completed {
            "Marked complete"
        } else {
            "Marked incomplete"
        });
        true
    })
}

// ---------------------------------------------------------------------------
// Subtasks
// ---------------------------------------------------------------------------

/// Append an incomplete subtask. Returns the new collection and the subtask
/// ID, or `None` if the parent task does not exist.
pub fn add_subtask(tasks: &[Task], task_id: &str, title: &str) -> Option<(Vec<Task>, String)> {
    let subtask = Subtask::new(title);
    let sub_id = subtask.id.clone();
    let next = edit_task(tasks, task_id, |task| {
        task.subtasks.push(subtask);
        task.log(format!("Added subtask: {}", title));
        true
    })?;
    Some((next, sub_id))
}

pub fn toggle_subtask(tasks: &[Task], task_id: &str, subtask_id: &str) -> Option<Vec<Task>> {
    edit_task(tasks, task_id, |task| {
        let Some(sub) = task.subtasks.iter_mut().find(|s| s.id == subtask_id) else {
            return false;
        };
        sub.completed = !sub.completed;
        task.log("Subtask toggled");
        true
    })
}

pub fn delete_subtask(tasks: &[Task], task_id: &str, subtask_id: &str) -> Option<Vec<Task>> {
    edit_task(tasks, task_id, |task| {
        let before = task.subtasks.len();
        task.subtasks.retain(|s| s.id != subtask_id);
        if task.subtasks.len() == before {
            return false;
        }
        task.log("Subtask deleted");
        true
    })
}

// ---------------------------------------------------------------------------
// Reordering
// ---------------------------------------------------------------------------

/// Move `moved_id` to the index `target_id` occupies. Both indices are read
/// before the removal, so moving down lands the task just after the target.
pub fn reorder_tasks(tasks: &[Task], moved_id: &str, target_id: &str) -> Option<Vec<Task>> {
    if moved_id == target_id {
        return None;
    }
    let from = find_index(tasks, moved_id)?;
    let to = find_index(tasks, target_id)?;
    let mut next = tasks.to_vec();
    move_item(&mut next, from, to);
    Some(next)
}

/// Same rule as [`reorder_tasks`], scoped to one task's subtask list
pub fn reorder_subtasks(
    tasks: &[Task],
    task_id: &str,
    moved_id: &str,
    target_id: &str,
) -> Option<Vec<Task>> {
    if moved_id == target_id {
        return None;
    }
    edit_task(tasks, task_id, |task| {
        let from = task.subtasks.iter().position(|s| s.id == moved_id);
        let to = task.subtasks.iter().position(|s| s.id == target_id);
        match (from, to) {
            (Some(from), Some(to)) => {
                move_item(&mut task.subtasks, from, to);
                true
            }
            _ => false,
        }
    })
}

/// Remove the item at `from` and insert it at `to`
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

pub fn find_task<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    tasks.iter().find(|t| t.id == id)
}

pub fn find_index(tasks: &[Task], id: &str) -> Option<usize> {
    tasks.iter().position(|t| t.id == id)
}

/// Apply `f` to a copy of the task with `id`. `f` returns false when it made
/// no change, in which case the collection is left alone.
fn edit_task(tasks: &[Task], id: &str, f: impl FnOnce(&mut Task) -> bool) -> Option<Vec<Task>> {
    let idx = find_index(tasks, id)?;
    let mut task = tasks[idx].clone();
    if !f(&mut task) {
        return None;
    }
    let mut next = tasks.to_vec();
    next[idx] = task;
    Some(next)
}
