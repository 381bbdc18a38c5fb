//! Multi-root filesystem watcher.
//!
//! A single notify backend watches every root and funnels raw events into one
//! shared [`ChangeDebouncer`]. The debouncer's flush task runs on the Tokio
//! runtime and invokes the change callback at most once per interval.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::debouncer::{self, ChangeDebouncer, ChangeSink};
use crate::error::WatchError;
use crate::event::RawChangeEvent;

/// Callback receiving each non-empty batch of changes.
pub type ChangeCallback = Box<dyn FnMut(Vec<RawChangeEvent>) + Send + 'static>;

enum State {
    Idle {
        debouncer: ChangeDebouncer,
        on_changed: ChangeCallback,
    },
    Running {
        stop: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// Watches one or more directories and reports debounced change batches.
///
/// OS-level watches are registered on construction, so registration failures
/// surface from [`new`](Self::new). Events are only buffered between
/// [`start`](Self::start) and [`shutdown`](Self::shutdown).
pub struct MultiPathWatcher {
    roots: Vec<PathBuf>,
    interval: Duration,
    recursive: bool,
    active: Arc<AtomicBool>,
    watcher: Option<RecommendedWatcher>,
    state: State,
}

impl MultiPathWatcher {
    /// Create a watcher over `roots`.
    ///
    /// Every root is checked before any watch is registered; the first one that
    /// is missing or not a directory is reported by name. Duplicate roots are
    /// watched once.
    ///
    /// `on_changed` runs on the flush task, never concurrently with itself.
    /// Panics inside it are not caught by the watcher.
    pub fn new<I, P, F>(
        roots: I,
        on_changed: F,
        interval: Duration,
        recursive: bool,
    ) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        F: FnMut(Vec<RawChangeEvent>) + Send + 'static,
    {
        if interval.is_zero() {
            return Err(WatchError::ZeroInterval);
        }
        let roots = validate_roots(roots)?;

        let (sink, debouncer) = debouncer::channel();
        let active = Arc::new(AtomicBool::new(false));
        let watcher = register(&roots, recursive, sink, Arc::clone(&active))?;

        Ok(Self {
            roots,
            interval,
            recursive,
            active,
            watcher: Some(watcher),
            state: State::Idle {
                debouncer,
                on_changed: Box::new(on_changed),
            },
        })
    }

    /// Canonical watch roots.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Flush interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether roots are watched recursively.
    #[must_use]
    pub fn recursive(&self) -> bool {
        self.recursive
    }

    /// Whether the watcher is currently capturing and flushing events.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    /// Begin capturing events and start the periodic flush.
    ///
    /// No-op when already running. Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<(), WatchError> {
        let state = std::mem::replace(&mut self.state, State::Stopped);
        let (debouncer, on_changed) = match state {
            State::Idle {
                debouncer,
                on_changed,
            } => (debouncer, on_changed),
            running @ State::Running { .. } => {
                self.state = running;
                return Ok(());
            }
            State::Stopped => return Err(WatchError::ShutDown),
        };

        self.active.store(true, Ordering::Release);
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(debouncer.run(self.interval, on_changed, stop_rx));
        self.state = State::Running { stop, task };

        tracing::debug!(roots = ?self.roots, "Started file system watcher");
        Ok(())
    }

    /// Stop flushing and release all OS-level watches.
    ///
    /// Waits up to `timeout` for the flush task to finish; exceeding it is
    /// logged, not reported. Safe to call repeatedly or before `start`.
    pub async fn shutdown(&mut self, timeout: Duration) {
        self.active.store(false, Ordering::Release);
        // Dropping the backend removes every watch and ends its thread.
        drop(self.watcher.take());

        let State::Running { stop, task } = std::mem::replace(&mut self.state, State::Stopped)
        else {
            return;
        };

        let _ = stop.send(());
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "File watcher flush task failed"),
            Err(_) => tracing::warn!(?timeout, "Timed out waiting for file watcher to stop"),
        }
        tracing::debug!(roots = ?self.roots, "Shut down file system watcher");
    }
}

/// Check every root up front and resolve it to a canonical path.
fn validate_roots<I, P>(roots: I) -> Result<Vec<PathBuf>, WatchError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut resolved: Vec<PathBuf> = Vec::new();

    for root in roots {
        let root = root.as_ref();
        let invalid = || WatchError::InvalidWatchRoot {
            path: root.to_path_buf(),
        };

        if !root.is_dir() {
            return Err(invalid());
        }
        let canonical = root.canonicalize().map_err(|_| invalid())?;
        if !resolved.contains(&canonical) {
            resolved.push(canonical);
        }
    }

    if resolved.is_empty() {
        return Err(WatchError::NoWatchRoots);
    }
    Ok(resolved)
}

/// Create the notify backend and register a watch per root.
fn register(
    roots: &[PathBuf],
    recursive: bool,
    sink: ChangeSink,
    active: Arc<AtomicBool>,
) -> Result<RecommendedWatcher, WatchError> {
    let mut watcher =
        notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !active.load(Ordering::Acquire) {
                    return;
                }
                for raw in RawChangeEvent::from_notify(event) {
                    tracing::debug!(path = %raw.path.display(), kind = ?raw.kind, "Recorded filesystem event");
                    sink.enqueue(raw);
                }
            }
            Err(err) => tracing::warn!(error = %err, "File watcher error"),
        })
        .map_err(WatchError::Init)?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    for root in roots {
        watcher
            .watch(root, mode)
            .map_err(|source| WatchError::Registration {
                path: root.clone(),
                source,
            })?;
        tracing::debug!(path = %root.display(), recursive, "Registered watch root");
    }

    Ok(watcher)
}
