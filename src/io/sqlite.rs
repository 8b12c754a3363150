use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, params};
use serde::Serialize;
use tokio::sync::OnceCell;

use super::repository::{StorageError, TaskRepository};
use crate::model::task::Task;

type SharedConnection = Arc<Mutex<Connection>>;

/// One stored row: every task field plus the owning user
#[derive(Serialize)]
struct RecordOut<'a> {
    #[serde(flatten)]
    task: &'a Task,
    user_id: &'a str,
}

/// Task repository backed by a SQLite file.
///
/// The connection is opened lazily on first use. Blocking SQLite calls run
/// on Tokio's blocking pool.
#[derive(Debug)]
pub struct SqliteRepository {
    path: PathBuf,
    conn: OnceCell<SharedConnection>,
}

impl SqliteRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteRepository {
            path: path.into(),
            conn: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The shared connection, opening it if this is the first call.
    /// A failed open is not cached; the next caller tries again.
    async fn connection(&self) -> Option<SharedConnection> {
        let path = self.path.clone();
        match self.conn.get_or_try_init(|| open(path)).await {
            Ok(conn) => Some(Arc::clone(conn)),
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to initialize task database");
                None
            }
        }
    }
}

async fn open(path: PathBuf) -> Result<SharedConnection, StorageError> {
    tokio::task::spawn_blocking(move || {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        install_schema(&conn)?;
        tracing::debug!(path = %path.display(), "opened task database");
        Ok(Arc::new(Mutex::new(conn)))
    })
    .await?
}

fn install_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
             id       TEXT PRIMARY KEY,
             user_id  TEXT NOT NULL,
             position INTEGER NOT NULL,
             record   TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS tasks_by_user ON tasks(user_id);",
    )?;
    Ok(())
}

fn fetch_rows(conn: &Connection, user_id: &str) -> Result<Vec<Task>, StorageError> {
    let mut stmt =
        conn.prepare("SELECT id, record FROM tasks WHERE user_id = ?1 ORDER BY position, id")?;
    let mut rows = stmt.query(params![user_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let record: String = row.get(1)?;
        match serde_json::from_str::<Task>(&record) {
            Ok(task) => out.push(task),
            Err(e) => tracing::warn!(task_id = %id, error = %e, "skipping undecodable task record"),
        }
    }
    Ok(out)
}

fn replace_rows(
    conn: &mut Connection,
    user_id: &str,
    rows: &[(String, String)],
) -> Result<(), StorageError> {
    let tx = conn.transaction()?;

    let existing: Vec<String> = {
        let mut stmt = tx.prepare("SELECT id FROM tasks WHERE user_id = ?1")?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    let keep: HashSet<&str> = rows.iter().map(|(id, _)| id.as_str()).collect();
    for id in existing.iter().filter(|id| !keep.contains(id.as_str())) {
        tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    }

    {
        let mut put = tx.prepare(
            "INSERT INTO tasks (id, user_id, position, record) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 user_id = excluded.user_id,
                 position = excluded.position,
                 record = excluded.record",
        )?;
        for (position, (id, record)) in rows.iter().enumerate() {
            put.execute(params![id, user_id, position as i64, record])?;
        }
    }

    tx.commit()?;
    Ok(())
}

impl SqliteRepository {
    async fn try_fetch(&self, user_id: &str) -> Result<Vec<Task>, StorageError> {
        let conn = self
            .connection()
            .await
            .ok_or_else(|| StorageError::Unavailable("database not initialized".into()))?;
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || fetch_rows(&conn.lock(), &user_id)).await?
    }

    async fn try_replace(&self, user_id: &str, tasks: &[Task]) -> Result<(), StorageError> {
        let conn = self
            .connection()
            .await
            .ok_or_else(|| StorageError::Unavailable("database not initialized".into()))?;
        let rows = tasks
            .iter()
            .map(|task| -> Result<(String, String), StorageError> {
                let record = serde_json::to_string(&RecordOut { task, user_id })?;
                Ok((task.id.clone(), record))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || replace_rows(&mut conn.lock(), &user_id, &rows)).await?
    }
}

impl TaskRepository for SqliteRepository {
    async fn initialize(&self) -> bool {
        self.connection().await.is_some()
    }

    async fn fetch_for_user(&self, user_id: &str) -> Vec<Task> {
        match self.try_fetch(user_id).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(user_id, error = %e, "failed to fetch tasks");
                Vec::new()
            }
        }
    }

    async fn replace_for_user(&self, user_id: &str, tasks: &[Task]) -> bool {
        match self.try_replace(user_id, tasks).await {
            Ok(()) => {
                tracing::debug!(user_id, count = tasks.len(), "saved tasks");
                true
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "failed to save tasks");
                false
            }
        }
    }
}
