//! Static file server with live reload.
//!
//! Serves a directory over HTTP, injects a small client script into every
//! HTML page, and tells connected browsers to reload whenever something under
//! the watched directories changes.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use hw_server::{ServerConfig, WatcherServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hw_server::ServerError> {
//!     let config = ServerConfig {
//!         static_root: PathBuf::from("site"),
//!         port: 8080,
//!         ..ServerConfig::default()
//!     };
//!
//!     WatcherServer::new(config, None)?.run().await
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (hw-server)
//!    ▲                  │
//!    │                  ├─► /httpwatcher.min.js (hw-assets)
//!    │                  ├─► /httpwatcher ──► ReloadBroadcaster sessions
//!    │                  └─► fallback ──► StaticFileResponder
//!    │                                      (script injection into HTML)
//!    │
//!    └──{"command":"reload"}── ReloadBroadcaster ◄── reload hook
//!                                       ▲
//!                    MultiPathWatcher ──┘ (hw-watcher, one batch per interval)
//! ```

mod app;
mod base_path;
mod browser;
mod content_type;
mod error;
mod live_reload;
mod responder;
mod server;
mod state;
mod static_files;

use std::path::PathBuf;
use std::time::Duration;

pub use app::PUSH_CHANNEL_PATH;
pub use base_path::BasePath;
pub use content_type::guess_content_type;
pub use error::ServerError;
pub use hw_watcher::{ChangeKind, RawChangeEvent};
pub use live_reload::{ReloadBroadcaster, ReloadMessage, SessionHandle, SessionId};
pub use responder::{DEFAULT_FILENAMES, Resolution, ResolvedFile, StaticFileResponder};
pub use server::{HookError, ReloadHook, WatcherServer};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory served over HTTP.
    pub static_root: PathBuf,
    /// Directories to watch; `None` or empty means the static root.
    pub watch_paths: Option<Vec<PathBuf>>,
    /// Host address to bind to and advertise.
    pub host: String,
    /// Port to listen on (`0` lets the OS pick).
    pub port: u16,
    /// URL prefix for the static root.
    pub base_path: String,
    /// Debounce interval between reload broadcasts.
    pub interval: Duration,
    /// Watch subdirectories too.
    pub recursive: bool,
    /// Open a browser once the server is up.
    pub open_browser: bool,
    /// Delay before opening the browser.
    pub open_browser_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("."),
            watch_paths: None,
            host: "localhost".to_owned(),
            port: 5555,
            base_path: "/".to_owned(),
            interval: Duration::from_secs(1),
            recursive: true,
            open_browser: false,
            open_browser_delay: Duration::from_secs(1),
        }
    }
}

/// Create server configuration from loaded httpwatch configuration.
#[must_use]
pub fn server_config_from_config(config: &hw_config::Config) -> ServerConfig {
    let watch = &config.watch_resolved;
    ServerConfig {
        static_root: watch.root.clone(),
        watch_paths: (!watch.paths.is_empty()).then(|| watch.paths.clone()),
        host: config.server.host.clone(),
        port: config.server.port,
        base_path: config.server.base_path.clone(),
        interval: watch.interval,
        recursive: watch.recursive,
        open_browser: config.browser_resolved.open,
        open_browser_delay: config.browser_resolved.delay,
    }
}
