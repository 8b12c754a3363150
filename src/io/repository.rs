use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::model::task::Task;

/// Error type for storage operations. It never crosses the repository
/// boundary: callers see an empty collection or a `false` flag instead.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("could not encode task record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Durable storage of task collections keyed by user.
///
/// Failures are logged by the implementation and reported as degraded
/// results, never as errors.
pub trait TaskRepository: Send + Sync + 'static {
    /// Prepare the underlying storage. Idempotent; concurrent callers share
    /// one in-flight initialization.
    fn initialize(&self) -> impl Future<Output = bool> + Send;

    /// All tasks stored for `user_id`, in saved order. Empty if storage is
    /// unavailable.
    fn fetch_for_user(&self, user_id: &str) -> impl Future<Output = Vec<Task>> + Send;

    /// Replace the user's stored collection with `tasks` in one atomic
    /// transaction. Returns false on failure.
    fn replace_for_user(&self, user_id: &str, tasks: &[Task]) -> impl Future<Output = bool> + Send;
}

#[derive(Debug, Clone)]
struct MemoryRecord {
    user_id: String,
    position: usize,
    task: Task,
}

/// In-memory repository for tests and throwaway sessions.
///
/// Can be switched offline to exercise the failure paths.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: Mutex<HashMap<String, MemoryRecord>>,
    offline: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate storage becoming unavailable (or available again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful `replace_for_user` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// IDs stored for `user_id`, in saved order
    pub fn stored_ids(&self, user_id: &str) -> Vec<String> {
        let records = self.records.lock();
        let mut rows: Vec<&MemoryRecord> =
            records.values().filter(|r| r.user_id == user_id).collect();
        rows.sort_by_key(|r| r.position);
        rows.into_iter().map(|r| r.task.id.clone()).collect()
    }

    fn check_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory repository offline".into()));
        }
        Ok(())
    }
}

impl TaskRepository for MemoryRepository {
    async fn initialize(&self) -> bool {
        self.check_online().is_ok()
    }

    async fn fetch_for_user(&self, user_id: &str) -> Vec<Task> {
        if let Err(e) = self.check_online() {
            tracing::error!(user_id, error = %e, "failed to fetch tasks");
            return Vec::new();
        }
        let records = self.records.lock();
        let mut rows: Vec<&MemoryRecord> =
            records.values().filter(|r| r.user_id == user_id).collect();
        rows.sort_by_key(|r| r.position);
        rows.into_iter().map(|r| r.task.clone()).collect()
    }

    async fn replace_for_user(&self, user_id: &str, tasks: &[Task]) -> bool {
        if let Err(e) = self.check_online() {
            tracing::error!(user_id, error = %e, "failed to save tasks");
            return false;
        }
        let keep: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        let mut records = self.records.lock();
        records.retain(|id, r| r.user_id != user_id || keep.contains(id.as_str()));
        for (position, task) in tasks.iter().enumerate() {
            records.insert(
                task.id.clone(),
                MemoryRecord {
                    user_id: user_id.to_string(),
                    position,
                    task: task.clone(),
                },
            );
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        true
    }
}
