//! Browser assets served alongside the watched site.
//!
//! The reload client is compiled into the binary via `rust-embed`. In debug
//! builds `rust-embed` reads it from `client/` at runtime, so edits to the
//! script do not need a rebuild.

use std::borrow::Cow;

/// Embedded client assets.
#[derive(rust_embed::RustEmbed)]
#[folder = "client/"]
struct Assets;

/// File name (and URL path segment) of the reload client script.
pub const CLIENT_SCRIPT_NAME: &str = "httpwatcher.min.js";

/// Content type the reload client is served with.
pub const CLIENT_SCRIPT_MIME: &str = "application/javascript";

/// Global function the client exports; called with the push channel URL.
pub const ACTIVATE_FUNCTION: &str = "activate";

/// Contents of the reload client script.
pub fn client_script() -> Option<Cow<'static, [u8]>> {
    Assets::get(CLIENT_SCRIPT_NAME).map(|f| f.data)
}
