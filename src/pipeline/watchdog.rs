//! Staleness watchdog for the remote frame
//!
//! When the peer stops sending (network loss, camera off on their side) the
//! last decoded image would otherwise stay on screen indefinitely.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::remote::RemoteFrameSlot;

/// Periodic staleness check, running until disarmed or dropped.
pub(crate) struct Watchdog {
    cancel: CancellationToken,
}

impl Watchdog {
    /// Every `interval`, clear the remote frame if it is older than `window`.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn arm(
        remote: Arc<RemoteFrameSlot>,
        interval: Duration,
        window: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if remote.clear_if_stale(window) {
                            debug!("Remote video stale for more than {:?}, cleared", window);
                        }
                    }
                }
            }
            debug!("Watchdog disarmed");
        });

        debug!(?interval, ?window, "Watchdog armed");
        Self { cancel }
    }

    pub(crate) fn is_armed(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub(crate) fn disarm(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
