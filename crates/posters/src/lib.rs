pub mod store;

use thiserror::Error;

/// Persisted cache could not be read or written.
///
/// Never surfaced to callers: unreadable storage means an empty cache and a
/// failed write is logged.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
