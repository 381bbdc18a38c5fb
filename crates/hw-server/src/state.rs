//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use crate::live_reload::ReloadBroadcaster;
use crate::responder::StaticFileResponder;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Resolves and renders static files.
    pub(crate) responder: StaticFileResponder,
    /// Registry of connected live reload sessions.
    pub(crate) broadcaster: Arc<ReloadBroadcaster>,
}
