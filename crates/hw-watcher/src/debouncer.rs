//! Rate-limited batching of raw filesystem events.
//!
//! The notify backend thread pushes events through a [`ChangeSink`]; the
//! [`ChangeDebouncer`] owns the receiving end and drains everything queued so
//! far once per interval, so a burst of editor writes collapses into a single
//! callback invocation. Nothing is coalesced or dropped: the batch carries
//! every raw event in arrival order.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use crate::event::RawChangeEvent;

/// Create a connected sink/debouncer pair.
#[must_use]
pub fn channel() -> (ChangeSink, ChangeDebouncer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChangeSink { tx }, ChangeDebouncer { rx })
}

/// Thread-safe enqueue side of the pending change buffer.
#[derive(Clone, Debug)]
pub struct ChangeSink {
    tx: mpsc::UnboundedSender<RawChangeEvent>,
}

impl ChangeSink {
    /// Append an event to the pending buffer.
    ///
    /// Never blocks, safe to call from any thread. Returns `false` once the
    /// debouncer has been dropped.
    pub fn enqueue(&self, event: RawChangeEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Owner of the pending change buffer.
#[derive(Debug)]
pub struct ChangeDebouncer {
    rx: mpsc::UnboundedReceiver<RawChangeEvent>,
}

impl ChangeDebouncer {
    /// Drain every event queued at this instant.
    ///
    /// Each event is removed as it is read, so an event is never observed by
    /// two flushes. Events enqueued after draining stops are left for the next
    /// flush.
    pub fn flush(&mut self) -> Vec<RawChangeEvent> {
        let mut batch = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            batch.push(event);
        }
        batch
    }

    /// Flush once per `interval` until `stop` fires or its sender is dropped.
    ///
    /// `on_changed` runs inline on this task and only for non-empty batches.
    /// A panicking callback is not caught here and ends the flush task.
    pub(crate) async fn run<F>(
        mut self,
        interval: Duration,
        mut on_changed: F,
        mut stop: oneshot::Receiver<()>,
    ) where
        F: FnMut(Vec<RawChangeEvent>),
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let batch = self.flush();
                    if batch.is_empty() {
                        continue;
                    }
                    tracing::debug!(count = batch.len(), "Detected filesystem changes, triggering callback");
                    on_changed(batch);
                }
            }
        }
    }
}
