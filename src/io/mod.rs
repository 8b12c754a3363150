pub mod config_io;
pub mod repository;
pub mod session;
pub mod sqlite;

pub use repository::{MemoryRepository, StorageError, TaskRepository};
pub use sqlite::SqliteRepository;
