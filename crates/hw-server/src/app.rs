//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::live_reload;
use crate::state::AppState;
use crate::static_files;

/// Path of the live reload WebSocket endpoint.
pub const PUSH_CHANNEL_PATH: &str = "/httpwatcher";

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let script_path = format!("/{}", hw_assets::CLIENT_SCRIPT_NAME);

    Router::new()
        .route(&script_path, get(static_files::serve_client_script))
        .route(PUSH_CHANNEL_PATH, get(live_reload::ws_handler))
        // Static files under the base path
        .fallback(static_files::serve_static)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
