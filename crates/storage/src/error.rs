use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection lock poisoned")]
    Poisoned,

    #[error("store task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
