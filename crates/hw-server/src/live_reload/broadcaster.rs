//! Registry of connected push-channel sessions.
//!
//! The broadcaster tracks membership only. Each session's socket is owned by
//! its own connection task; the registry keeps the sending half of a channel
//! into that task, so a broadcast never waits on network I/O.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Notification pushed to browsers. `reload` is the only command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReloadMessage {
    command: &'static str,
}

impl ReloadMessage {
    /// The reload command.
    #[must_use]
    pub fn reload() -> Self {
        Self { command: "reload" }
    }

    /// Wire representation: `{"command":"reload"}`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Opaque identifier of a connected session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Allocate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Write-capable handle to a session's connection task.
pub type SessionHandle = mpsc::UnboundedSender<ReloadMessage>;

/// Fans reload messages out to every registered session.
#[derive(Debug, Default)]
pub struct ReloadBroadcaster {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl ReloadBroadcaster {
    /// Create an empty broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a session. Returns `false` (and keeps the existing handle) if the
    /// id is already registered.
    pub fn register_session(&self, id: SessionId, handle: SessionHandle) -> bool {
        let mut sessions = self.sessions();
        if sessions.contains_key(&id) {
            return false;
        }
        sessions.insert(id, handle);
        true
    }

    /// Remove a session. Returns `false` if it was not registered.
    pub fn deregister_session(&self, id: SessionId) -> bool {
        self.sessions().remove(&id).is_some()
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Queue `message` for every registered session.
    ///
    /// A session whose connection task is gone is skipped without affecting the
    /// others. Returns the number of sessions the message was queued for.
    pub fn broadcast(&self, message: &ReloadMessage) -> usize {
        let sessions = self.sessions();
        tracing::debug!(
            sessions = sessions.len(),
            "Broadcasting message to connected clients"
        );

        sessions
            .iter()
            .filter(|(id, handle)| {
                let sent = handle.send(message.clone()).is_ok();
                if !sent {
                    tracing::debug!(session = %id, "Session closed before message was queued");
                }
                sent
            })
            .count()
    }

    /// Drop every session, which ends their connection tasks.
    pub fn close_all(&self) {
        let closed = std::mem::take(&mut *self.sessions());
        if !closed.is_empty() {
            tracing::debug!(sessions = closed.len(), "Closed all client sessions");
        }
    }
}
