pub mod debounce;
pub mod history;

pub use debounce::Debouncer;
pub use history::{DEFAULT_HISTORY_LIMIT, History, Snapshot};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::io::repository::TaskRepository;
use crate::model::config::Config;
use crate::model::task::{Task, TaskDraft, TaskPatch};
use crate::ops::task_ops;

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(300);

/// Tunables for a [`TaskStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub history_limit: usize,
    pub save_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            history_limit: DEFAULT_HISTORY_LIMIT,
            save_delay: DEFAULT_SAVE_DELAY,
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        StoreOptions {
            history_limit: config.history.limit,
            save_delay: Duration::from_millis(config.persist.debounce_ms),
        }
    }
}

/// Everything the store guards behind its lock
#[derive(Debug, Default)]
struct Session {
    tasks: Snapshot,
    history: History,
    user_id: Option<String>,
    loaded: bool,
    /// Bumped by every load and clear so a slow fetch can tell it was
    /// superseded
    epoch: u64,
}

impl Session {
    fn persistable(&self) -> bool {
        self.loaded && self.user_id.is_some()
    }
}

/// The single owner of the task collection.
///
/// Every mutator records the pre-mutation collection for undo, swaps in the
/// new collection and, when a user's collection is loaded, schedules a
/// debounced save. Mutators run synchronously; saves and loads are async.
pub struct TaskStore<R: TaskRepository> {
    state: Arc<Mutex<Session>>,
    repo: Arc<R>,
    saver: Debouncer,
    /// Held for the whole of each save so writes land in the order they
    /// read the session. Guards the outcome of the last finished save.
    last_save: Arc<AsyncMutex<bool>>,
}

impl<R: TaskRepository> TaskStore<R> {
    pub fn new(repo: Arc<R>, options: StoreOptions) -> Self {
        let session = Session {
            history: History::new(options.history_limit),
            ..Default::default()
        };
        TaskStore {
            state: Arc::new(Mutex::new(session)),
            repo,
            saver: Debouncer::new(options.save_delay),
            last_save: Arc::new(AsyncMutex::new(true)),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Make `user_id` the active user and replace the collection with their
    /// stored tasks. Resets history; not undoable.
    ///
    /// Returns false if a `clear` or another `load` superseded this one while
    /// the fetch was in flight.
    pub async fn load(&self, user_id: &str) -> bool {
        // Don't lose the outgoing session's pending edits
        self.flush().await;

        let epoch = {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.user_id = Some(user_id.to_string());
            state.loaded = false;
            state.epoch
        };

        let tasks = self.repo.fetch_for_user(user_id).await;

        let mut state = self.state.lock();
        if state.epoch != epoch {
            tracing::debug!(user_id, "discarding superseded load");
            return false;
        }
        tracing::debug!(user_id, count = tasks.len(), "loaded tasks");
        state.tasks = Arc::new(tasks);
        state.history.clear();
        state.loaded = true;
        true
    }

    /// Forget the active user, the collection and all history. Not undoable.
    /// A save that has already started is left to finish.
    pub fn clear(&self) {
        self.saver.cancel();
        let mut state = self.state.lock();
        state.epoch += 1;
        state.tasks = Snapshot::default();
        state.history.clear();
        state.user_id = None;
        state.loaded = false;
    }

    /// Run a pending save now instead of waiting for the quiet period, or
    /// wait for one that is already writing. Returns false if that save
    /// failed.
    pub async fn flush(&self) -> bool {
        if self.saver.cancel() {
            return save_current(&self.state, self.repo.as_ref(), &self.last_save).await;
        }
        *self.last_save.lock().await
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a new task. Returns its ID.
    pub fn add_task(&self, draft: TaskDraft) -> String {
        let mut new_id = String::new();
        self.apply(|tasks| {
            let (next, id) = task_ops::add_task(tasks, draft);
            new_id = id;
            Some(next)
        });
        new_id
    }

    pub fn update_task(&self, id: &str, patch: TaskPatch) -> bool {
        self.apply(|tasks| task_ops::update_task(tasks, id, patch))
    }

    pub fn delete_task(&self, id: &str) -> bool {
        self.apply(|tasks| task_ops::delete_task(tasks, id))
    }

    pub fn toggle_complete(&self, id: &str) -> bool {
        self.apply(|tasks| task_ops::toggle_complete(tasks, id))
    }

    /// Returns the new subtask's ID, or `None` if the task does not exist
    pub fn add_subtask(&self, task_id: &str, title: &str) -> Option<String> {
        let mut new_id = None;
        self.apply(|tasks| {
            let (next, id) = task_ops::add_subtask(tasks, task_id, title)?;
            new_id = Some(id);
            Some(next)
        });
        new_id
    }

    pub fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> bool {
        self.apply(|tasks| task_ops::toggle_subtask(tasks, task_id, subtask_id))
    }

    pub fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> bool {
        self.apply(|tasks| task_ops::delete_subtask(tasks, task_id, subtask_id))
    }

    /// Move `moved_id` into `target_id`'s position. Moving a task onto
    /// itself records nothing.
    pub fn reorder_tasks(&self, moved_id: &str, target_id: &str) -> bool {
        if moved_id == target_id {
            return false;
        }
        self.apply(|tasks| task_ops::reorder_tasks(tasks, moved_id, target_id))
    }

    pub fn reorder_subtasks(&self, task_id: &str, moved_id: &str, target_id: &str) -> bool {
        if moved_id == target_id {
            return false;
        }
        self.apply(|tasks| task_ops::reorder_subtasks(tasks, task_id, moved_id, target_id))
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Restore the state before the last mutation. False if there is none.
    pub fn undo(&self) -> bool {
        self.travel(|history, current| history.undo(current))
    }

    /// Re-apply the last undone mutation. False if there is none.
    pub fn redo(&self) -> bool {
        self.travel(|history, current| history.redo(current))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The current collection. Cheap: the snapshot is shared.
    pub fn tasks(&self) -> Snapshot {
        Arc::clone(&self.state.lock().tasks)
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        task_ops::find_task(&self.state.lock().tasks, id).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.state.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state.lock().history.can_redo()
    }

    /// (undo depth, redo depth)
    pub fn history_depth(&self) -> (usize, usize) {
        self.state.lock().history.depth()
    }

    pub fn user_id(&self) -> Option<String> {
        self.state.lock().user_id.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    pub fn save_pending(&self) -> bool {
        self.saver.is_pending()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Record history, then swap in the edited collection if `edit` produced
    /// one. The snapshot is recorded even when nothing changed.
    fn apply(&self, edit: impl FnOnce(&[Task]) -> Option<Vec<Task>>) -> bool {
        let mut state = self.state.lock();
        let before = Arc::clone(&state.tasks);
        state.history.record(Arc::clone(&before));
        let Some(next) = edit(&before) else {
            return false;
        };
        state.tasks = Arc::new(next);
        let persist = state.persistable();
        drop(state);

        if persist {
            self.schedule_save();
        }
        true
    }

    fn travel(&self, step: impl FnOnce(&mut History, Snapshot) -> Option<Snapshot>) -> bool {
        let mut state = self.state.lock();
        let current = Arc::clone(&state.tasks);
        let Some(restored) = step(&mut state.history, Arc::clone(&current)) else {
            return false;
        };
        let changed = !Arc::ptr_eq(&restored, &current);
        state.tasks = restored;
        let persist = changed && state.persistable();
        drop(state);

        if persist {
            self.schedule_save();
        }
        true
    }

    fn schedule_save(&self) {
        let state = Arc::clone(&self.state);
        let repo = Arc::clone(&self.repo);
        let last_save = Arc::clone(&self.last_save);
        self.saver.schedule(async move {
            save_current(&state, repo.as_ref(), &last_save).await;
        });
    }
}

/// Save whatever the session holds once no other save is writing. Skipped
/// when no user's collection is loaded, e.g. after logout.
async fn save_current<R: TaskRepository>(
    state: &Mutex<Session>,
    repo: &R,
    last_save: &AsyncMutex<bool>,
) -> bool {
    let mut outcome = last_save.lock().await;
    let (user_id, tasks) = {
        let state = state.lock();
        match &state.user_id {
            Some(user_id) if state.loaded => (user_id.clone(), Arc::clone(&state.tasks)),
            _ => {
                tracing::debug!("skipping save: no active session");
                return true;
            }
        }
    };
    *outcome = repo.replace_for_user(&user_id, &tasks).await;
    *outcome
}

impl<R: TaskRepository> Drop for TaskStore<R> {
    fn drop(&mut self) {
        if self.saver.is_pending() {
            tracing::warn!("task store dropped with an unsaved change; call flush() before exit");
        }
    }
}
