//! Watcher error types.

use std::path::PathBuf;

/// Errors raised while constructing or driving a [`MultiPathWatcher`](crate::MultiPathWatcher).
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// No watch roots were supplied.
    #[error("At least one watch path is required")]
    NoWatchRoots,

    /// Flush interval was zero.
    #[error("Watch interval must be greater than zero")]
    ZeroInterval,

    /// Watch root is missing or not a directory.
    #[error("Invalid watch path (must be an existing directory): {}", .path.display())]
    InvalidWatchRoot {
        /// The offending path as supplied.
        path: PathBuf,
    },

    /// OS watcher backend could not be created.
    #[error("Failed to initialize file watcher: {0}")]
    Init(#[source] notify::Error),

    /// OS-level watch registration failed for a root.
    #[error("Cannot watch {}: {source}", .path.display())]
    Registration {
        /// Root that failed to register.
        path: PathBuf,
        /// Backend error.
        #[source]
        source: notify::Error,
    },

    /// `start()` was called after `shutdown()`.
    #[error("Watcher has been shut down")]
    ShutDown,
}
