//! Raw filesystem change events.
//!
//! Events are produced on the notify backend thread and live for at most one
//! debounce cycle before being handed to the change callback.

use std::path::PathBuf;
use std::time::SystemTime;

use notify::EventKind;
use notify::event::ModifyKind;

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File or directory was created.
    Created,
    /// File contents or metadata changed.
    Modified,
    /// File or directory was removed.
    Deleted,
    /// File or directory was renamed (one event per path involved).
    Moved,
}

impl ChangeKind {
    /// Map a notify event kind, ignoring access and unclassified events.
    pub(crate) fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Moved),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Deleted),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}

/// A single filesystem change as reported by the OS watcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChangeEvent {
    /// Absolute path that changed.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Time the event was captured.
    pub timestamp: SystemTime,
}

impl RawChangeEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(path: PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            timestamp: SystemTime::now(),
        }
    }

    /// Expand a notify event into one raw event per affected path.
    pub(crate) fn from_notify(event: notify::Event) -> Vec<Self> {
        let Some(kind) = ChangeKind::from_notify(&event.kind) else {
            return Vec::new();
        };
        let timestamp = SystemTime::now();

        event
            .paths
            .into_iter()
            .map(|path| Self {
                path,
                kind,
                timestamp,
            })
            .collect()
    }
}
