//! Error types for session storage.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON object of strings.
    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Simulated or backend-specific failure.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
