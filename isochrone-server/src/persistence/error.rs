//! Persistence errors.

/// Error from a persistence store.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}
