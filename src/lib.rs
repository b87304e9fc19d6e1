/// Public library interface for the learning tracker
///
/// This crate keeps a user's goals, roadmaps, streak and badges on the
/// client. The engine is pure, the storage layer is a shared key -> JSON
/// store, and the `StateManager` ties both to a clock and a session timer.

use thiserror::Error;

pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod manager;
pub mod remote;
pub mod session;
pub mod storage;

// Re-export public modules and types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{default_database_path, TrackerConfig};
pub use domain::*;
pub use engine::{apply, replay, Action, EngineError};
pub use manager::{Intent, ProgressView, StateManager};
pub use remote::{JsonFileBackup, RemoteBackup, RemoteError};
pub use session::{SessionRunner, SessionTimer, TimerError, TimerSnapshot, TimerState};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageError};

/// Errors surfaced to callers of the tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("{0}")]
    Engine(#[from] engine::EngineError),

    #[error("Session error: {0}")]
    Timer(#[from] session::TimerError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Backup error: {0}")]
    Remote(#[from] remote::RemoteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
