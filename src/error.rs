//! Error type shared by the scheduler, the stores and the exporters.

/// Everything that can go wrong inside the crate.
#[derive(Debug, thiserror::Error)]
pub enum SrsError {
    /// Quality outside `[0, 5]` or a corrupt prior scheduling state
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Malformed progress file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// File system failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, SrsError>;
