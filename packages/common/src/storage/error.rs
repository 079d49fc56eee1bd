use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob is stored under the requested name.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The name is not a flat, safe filename (or the extension is not usable).
    #[error("invalid blob name: {0}")]
    InvalidName(String),

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    /// Every generated name was already taken on disk.
    #[error("could not allocate a unique blob name after {attempts} attempts")]
    NameCollision { attempts: usize },

    /// The underlying medium could not be read or written.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
