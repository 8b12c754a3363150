//! Property tests for undo/redo history and repository round trips.

use std::sync::Arc;

use proptest::prelude::*;
use taskflow::io::{MemoryRepository, SqliteRepository, TaskRepository};
use taskflow::model::task::{Task, TaskDraft, TaskPatch};
use taskflow::store::{StoreOptions, TaskStore};

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Update(usize, String),
    Delete(usize),
    Toggle(usize),
    AddSubtask(usize, String),
    ToggleSubtask(usize, usize),
    DeleteSubtask(usize, usize),
    Reorder(usize, usize),
    ReorderSubtasks(usize, usize, usize),
    /// Targets an ID that never exists
    Missing,
}

fn op() -> impl Strategy<Value = Op> {
    let title = "[a-z]{1,8}";
    prop_oneof![
        3 => title.prop_map(Op::Add),
        1 => (any::<usize>(), title).prop_map(|(i, t)| Op::Update(i, t)),
        1 => any::<usize>().prop_map(Op::Delete),
        2 => any::<usize>().prop_map(Op::Toggle),
        2 => (any::<usize>(), title).prop_map(|(i, t)| Op::AddSubtask(i, t)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(i, s)| Op::ToggleSubtask(i, s)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(i, s)| Op::DeleteSubtask(i, s)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Reorder(a, b)),
        1 => (any::<usize>(), any::<usize>(), any::<usize>())
            .prop_map(|(i, a, b)| Op::ReorderSubtasks(i, a, b)),
        1 => Just(Op::Missing),
    ]
}

fn pick(tasks: &[Task], i: usize) -> String {
    if tasks.is_empty() {
        "missing".to_string()
    } else {
        tasks[i % tasks.len()].id.clone()
    }
}

fn pick_sub(tasks: &[Task], i: usize, s: usize) -> (String, String) {
    if tasks.is_empty() {
        return ("missing".into(), "missing".into());
    }
    let task = &tasks[i % tasks.len()];
    let sub = if task.subtasks.is_empty() {
        "missing".to_string()
    } else {
        task.subtasks[s % task.subtasks.len()].id.clone()
    };
    (task.id.clone(), sub)
}

fn apply<R: TaskRepository>(store: &TaskStore<R>, op: &Op) {
    let tasks = store.tasks();
    match op {
        Op::Add(title) => {
            store.add_task(TaskDraft::new(title.clone()));
        }
        Op::Update(i, title) => {
            let patch = TaskPatch {
                title: Some(title.clone()),
                ..Default::default()
            };
            store.update_task(&pick(&tasks, *i), patch);
        }
        Op::Delete(i) => {
            store.delete_task(&pick(&tasks, *i));
        }
        Op::Toggle(i) => {
            store.toggle_complete(&pick(&tasks, *i));
        }
        Op::AddSubtask(i, title) => {
            store.add_subtask(&pick(&tasks, *i), title);
        }
        Op::ToggleSubtask(i, s) => {
            let (task, sub) = pick_sub(&tasks, *i, *s);
            store.toggle_subtask(&task, &sub);
        }
        Op::DeleteSubtask(i, s) => {
            let (task, sub) = pick_sub(&tasks, *i, *s);
            store.delete_subtask(&task, &sub);
        }
        Op::Reorder(a, b) => {
            store.reorder_tasks(&pick(&tasks, *a), &pick(&tasks, *b));
        }
        Op::ReorderSubtasks(i, a, b) => {
            let (task, moved) = pick_sub(&tasks, *i, *a);
            let (_, target) = pick_sub(&tasks, *i, *b);
            store.reorder_subtasks(&task, &moved, &target);
        }
        Op::Missing => {
            store.toggle_complete("missing");
        }
    }
}

fn new_store() -> TaskStore<MemoryRepository> {
    TaskStore::new(Arc::new(MemoryRepository::new()), StoreOptions::default())
}

proptest! {
    #[test]
    fn undo_all_restores_original_and_redo_all_restores_final(
        setup in prop::collection::vec(op(), 0..10),
        ops in prop::collection::vec(op(), 1..30),
    ) {
        let store = new_store();
        for op in &setup {
            apply(&store, op);
        }
        let original = store.tasks();
        let (depth_before, _) = store.history_depth();

        for op in &ops {
            apply(&store, op);
        }
        let last = store.tasks();
        let (depth_after, _) = store.history_depth();
        let recorded = depth_after - depth_before;

        for _ in 0..recorded {
            prop_assert!(store.undo());
        }
        let undone = store.tasks();
        prop_assert_eq!(&*undone, &*original);

        for _ in 0..recorded {
            prop_assert!(store.redo());
        }
        let redone = store.tasks();
        prop_assert_eq!(&*redone, &*last);
        prop_assert!(!store.redo());
    }

    #[test]
    fn mutate_undo_mutate_leaves_nothing_to_redo(
        setup in prop::collection::vec(op(), 0..10),
        first in "[a-z]{1,8}",
        second in "[a-z]{1,8}",
    ) {
        let store = new_store();
        for op in &setup {
            apply(&store, op);
        }
        store.add_task(TaskDraft::new(first));
        store.undo();
        store.add_task(TaskDraft::new(second));
        let after = store.tasks();

        prop_assert!(!store.can_redo());
        prop_assert!(!store.redo());
        prop_assert!(Arc::ptr_eq(&after, &store.tasks()));
    }

    #[test]
    fn reorder_onto_self_changes_nothing(
        setup in prop::collection::vec(op(), 1..15),
        i in any::<usize>(),
        s in any::<usize>(),
    ) {
        let store = new_store();
        for op in &setup {
            apply(&store, op);
        }
        let tasks = store.tasks();
        let depth = store.history_depth();
        let id = pick(&tasks, i);
        let (task, sub) = pick_sub(&tasks, i, s);

        prop_assert!(!store.reorder_tasks(&id, &id));
        prop_assert!(!store.reorder_subtasks(&task, &sub, &sub));
        prop_assert_eq!(store.history_depth(), depth);
        prop_assert!(Arc::ptr_eq(&tasks, &store.tasks()));
    }

    #[test]
    fn memory_replace_then_fetch_round_trips(
        titles in prop::collection::vec("[a-z]{1,8}", 0..12),
        keep in prop::collection::vec(any::<bool>(), 12),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let repo = MemoryRepository::new();
        check_round_trip(&rt, &repo, &titles, &keep)?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sqlite_replace_then_fetch_round_trips(
        titles in prop::collection::vec("[a-z]{1,8}", 0..8),
        keep in prop::collection::vec(any::<bool>(), 8),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let repo = SqliteRepository::new(dir.path().join("tasks.db"));
        check_round_trip(&rt, &repo, &titles, &keep)?;
    }
}

/// Save a collection, read it back, then save a subset and check that
/// exactly the dropped IDs are gone and other users are untouched.
fn check_round_trip<R: TaskRepository>(
    rt: &tokio::runtime::Runtime,
    repo: &R,
    titles: &[String],
    keep: &[bool],
) -> Result<(), TestCaseError> {
    let tasks: Vec<Task> = titles
        .iter()
        .map(|t| Task::from_draft(TaskDraft::new(t.clone())))
        .collect();
    let neighbour = vec![Task::from_draft(TaskDraft::new("neighbour"))];

    rt.block_on(async {
        prop_assert!(repo.replace_for_user("other", &neighbour).await);
        prop_assert!(repo.replace_for_user("me", &tasks).await);
        prop_assert_eq!(repo.fetch_for_user("me").await, tasks.clone());

        let subset: Vec<Task> = tasks
            .iter()
            .zip(keep.iter())
            .filter(|(_, keep)| **keep)
            .map(|(t, _)| t.clone())
            .collect();
        prop_assert!(repo.replace_for_user("me", &subset).await);
        prop_assert_eq!(repo.fetch_for_user("me").await, subset);
        prop_assert_eq!(repo.fetch_for_user("other").await, neighbour.clone());
        Ok(())
    })
}
