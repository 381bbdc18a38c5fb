//! Server error types.

use std::path::PathBuf;

use hw_watcher::WatchError;

/// Errors raised while constructing or starting a [`WatcherServer`](crate::WatcherServer).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Static root is missing or not a directory.
    #[error("Cannot find folder: {}", .0.display())]
    MissingRoot(PathBuf),

    /// Base path cannot be normalized to `/` or `/segment/`.
    #[error("Invalid base path: {0:?}")]
    InvalidBasePath(String),

    /// Watcher construction or startup failed.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// HTTP listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested `host:port`.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// Other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
