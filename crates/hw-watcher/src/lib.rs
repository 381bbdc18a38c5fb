//! Debounced filesystem watching for httpwatch.
//!
//! [`MultiPathWatcher`] watches any number of directories through a single
//! `notify` backend. Raw events cross from the backend thread into a
//! [`ChangeDebouncer`] through a thread-safe queue; a Tokio task drains the
//! queue once per interval and hands each non-empty batch to the caller's
//! callback.
//!
//! ```text
//! notify thread ──enqueue──► ChangeSink ═══ queue ═══► ChangeDebouncer
//!                                                           │ every interval
//!                                                           ▼
//!                                                   on_changed(batch)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use hw_watcher::MultiPathWatcher;
//!
//! let mut watcher = MultiPathWatcher::new(
//!     ["site", "templates"],
//!     |batch| println!("{} change(s)", batch.len()),
//!     Duration::from_secs(1),
//!     true,
//! )?;
//! watcher.start()?;
//! // ...
//! watcher.shutdown(Duration::from_secs(1)).await;
//! ```

mod debouncer;
mod error;
mod event;
mod watcher;

pub use debouncer::{ChangeDebouncer, ChangeSink, channel};
pub use error::WatchError;
pub use event::{ChangeKind, RawChangeEvent};
pub use watcher::{ChangeCallback, MultiPathWatcher};
