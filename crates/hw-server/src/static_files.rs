//! Static file serving.
//!
//! Everything that is not the client script or the push channel falls through
//! to the [`StaticFileResponder`](crate::StaticFileResponder).

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Serve a file from the static root.
pub(crate) async fn serve_static(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    state.responder.respond(&method, uri.path()).await
}

/// Serve the embedded reload client.
pub(crate) async fn serve_client_script() -> Response {
    let Some(content) = hw_assets::client_script() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    (
        [(header::CONTENT_TYPE, hw_assets::CLIENT_SCRIPT_MIME)],
        content.into_owned(),
    )
        .into_response()
}
