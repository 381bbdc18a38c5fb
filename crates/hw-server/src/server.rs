//! Composition of watcher, responder and broadcaster.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hw_watcher::{MultiPathWatcher, RawChangeEvent};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::ServerConfig;
use crate::app::{self, PUSH_CHANNEL_PATH};
use crate::base_path::BasePath;
use crate::browser;
use crate::error::ServerError;
use crate::live_reload::{ReloadBroadcaster, ReloadMessage};
use crate::responder::StaticFileResponder;
use crate::state::AppState;

/// How long `shutdown` waits for the watcher's flush task.
const WATCHER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// How long `shutdown` waits for in-flight HTTP requests.
const HTTP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type a reload hook may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// User hook run before each reload broadcast with the batch that caused it.
pub type ReloadHook = Arc<dyn Fn(&[RawChangeEvent]) -> Result<(), HookError> + Send + Sync>;

/// Runs the user hook, then broadcasts the reload command.
struct ReloadTrigger {
    broadcaster: Arc<ReloadBroadcaster>,
    hook: Option<ReloadHook>,
}

impl ReloadTrigger {
    fn fire(&self, batch: &[RawChangeEvent]) {
        if let Some(hook) = &self.hook
            && let Err(err) = hook(batch)
        {
            tracing::warn!(error = %err, "Reload hook failed, broadcasting anyway");
        }

        let delivered = self.broadcaster.broadcast(&ReloadMessage::reload());
        tracing::debug!(changes = batch.len(), sessions = delivered, "Triggered reload");
    }
}

/// Handles owned while the HTTP listener is up.
struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    browser: Option<JoinHandle<()>>,
}

/// Static file server that tells connected browsers to reload on change.
///
/// ```ignore
/// let mut server = WatcherServer::new(ServerConfig::default(), None)?;
/// let addr = server.listen().await?;
/// // ...
/// server.shutdown().await;
/// ```
pub struct WatcherServer {
    config: ServerConfig,
    static_root: PathBuf,
    base_path: BasePath,
    watcher: MultiPathWatcher,
    broadcaster: Arc<ReloadBroadcaster>,
    trigger: Arc<ReloadTrigger>,
    running: Option<Running>,
}

impl WatcherServer {
    /// Validate the configuration and set up the watcher.
    ///
    /// Watches `config.watch_paths`, or the static root when none are given.
    /// The optional `on_reload` hook runs before every broadcast; an error it
    /// returns is logged and the broadcast still happens.
    pub fn new(config: ServerConfig, on_reload: Option<ReloadHook>) -> Result<Self, ServerError> {
        let static_root = canonical_dir(&config.static_root)
            .ok_or_else(|| ServerError::MissingRoot(config.static_root.clone()))?;
        let base_path = BasePath::parse(&config.base_path)?;

        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let trigger = Arc::new(ReloadTrigger {
            broadcaster: Arc::clone(&broadcaster),
            hook: on_reload,
        });

        let watch_paths = config
            .watch_paths
            .clone()
            .filter(|paths| !paths.is_empty())
            .unwrap_or_else(|| vec![static_root.clone()]);
        let trigger_for_watcher = Arc::clone(&trigger);
        let watcher = MultiPathWatcher::new(
            &watch_paths,
            move |batch| trigger_for_watcher.fire(&batch),
            config.interval,
            config.recursive,
        )?;

        Ok(Self {
            config,
            static_root,
            base_path,
            watcher,
            broadcaster,
            trigger,
            running: None,
        })
    }

    /// Canonical static root.
    #[must_use]
    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Normalized base path.
    #[must_use]
    pub fn base_path(&self) -> &BasePath {
        &self.base_path
    }

    /// Canonical watch roots.
    #[must_use]
    pub fn watch_roots(&self) -> &[PathBuf] {
        self.watcher.roots()
    }

    /// Session registry used for reload broadcasts.
    #[must_use]
    pub fn broadcaster(&self) -> &Arc<ReloadBroadcaster> {
        &self.broadcaster
    }

    /// Bound address while listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// URL of the site root as advertised to browsers.
    #[must_use]
    pub fn url(&self, port: u16) -> String {
        format!("http://{}:{port}{}", self.config.host, self.base_path)
    }

    /// Build the router, advertising `port` in the injected URLs.
    pub fn router(&self, port: u16) -> Router {
        let host = &self.config.host;
        let script_url = format!("http://{host}:{port}/{}", hw_assets::CLIENT_SCRIPT_NAME);
        let push_url = format!("ws://{host}:{port}{PUSH_CHANNEL_PATH}");

        let state = Arc::new(AppState {
            responder: StaticFileResponder::new(
                self.static_root.clone(),
                self.base_path.clone(),
                &script_url,
                &push_url,
            ),
            broadcaster: Arc::clone(&self.broadcaster),
        });
        app::create_router(state)
    }

    /// Bind the HTTP port, start watching and optionally open a browser.
    ///
    /// Returns the bound address. Calling it again while listening returns
    /// the same address.
    pub async fn listen(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            return Ok(running.addr);
        }

        let host = self.config.host.as_str();
        let listener = TcpListener::bind((host, self.config.port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: format!("{host}:{}", self.config.port),
                source,
            })?;
        let addr = listener.local_addr()?;
        let app = self.router(addr.port());

        self.watcher.start()?;

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let url = self.url(addr.port());
        tracing::info!(url = %url, "Started HTTP watcher server");

        let browser = self
            .config
            .open_browser
            .then(|| browser::open_after(url, self.config.open_browser_delay));

        self.running = Some(Running {
            addr,
            shutdown,
            task,
            browser,
        });
        Ok(addr)
    }

    /// Run the reload hook and broadcast a reload for `batch`.
    ///
    /// Called by the watcher once per debounce interval with a non-empty
    /// batch; exposed for callers that detect changes themselves.
    pub fn trigger_reload(&self, batch: &[RawChangeEvent]) {
        self.trigger.fire(batch);
    }

    /// Stop the watcher, disconnect sessions and release the listener.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&mut self) {
        tracing::info!("Shutting down HTTP watcher server...");
        self.watcher.shutdown(WATCHER_SHUTDOWN_TIMEOUT).await;
        self.broadcaster.close_all();

        if let Some(running) = self.running.take() {
            if let Some(browser) = running.browser {
                browser.abort();
            }
            let _ = running.shutdown.send(());
            match tokio::time::timeout(HTTP_SHUTDOWN_TIMEOUT, running.task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(err))) => tracing::warn!(error = %err, "HTTP server stopped with error"),
                Ok(Err(err)) => tracing::warn!(error = %err, "HTTP server task failed"),
                Err(_) => tracing::warn!("Timed out waiting for HTTP server to stop"),
            }
        }
        tracing::info!("HTTP watcher server terminated");
    }

    /// Listen until Ctrl-C, then shut down.
    pub async fn run(mut self) -> Result<(), ServerError> {
        self.listen().await?;
        shutdown_signal().await;
        self.shutdown().await;
        Ok(())
    }
}

/// Resolve `path` to a canonical directory, or `None` if it is not one.
fn canonical_dir(path: &Path) -> Option<PathBuf> {
    let canonical = path.canonicalize().ok()?;
    canonical.is_dir().then_some(canonical)
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
