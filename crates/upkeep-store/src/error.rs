use thiserror::Error;

/// Errors that can occur within the task store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task with the given ID exists.
    #[error("task not found: {id}")]
    NotFound { id: String },

    /// Underlying SQLite / rusqlite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
