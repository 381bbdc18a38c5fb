//! Delayed browser launch.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Open `url` in the default browser once `delay` has passed.
///
/// Best-effort: failures are logged and otherwise ignored.
pub(crate) fn open_after(url: String, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let target = url.clone();
        // Some launchers block until the browser process exits.
        match tokio::task::spawn_blocking(move || open::that(target)).await {
            Ok(Ok(())) => tracing::debug!(url = %url, "Opened browser"),
            Ok(Err(err)) => tracing::warn!(url = %url, error = %err, "Failed to open browser"),
            Err(err) => tracing::warn!(url = %url, error = %err, "Browser launch task failed"),
        }
    })
}
