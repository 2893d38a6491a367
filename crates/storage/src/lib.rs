#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    HISTORY_LIMIT, InMemoryRepository, ReviewRecordRepository, SessionSnapshotRepository, Storage,
    StorageError, WordRepository, WordSource,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
