//! The current remote frame, shared between the decode worker, the watchdog
//! and readers.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::types::DecodedFrame;

/// A decoded remote image with the instant it arrived.
#[derive(Debug, Clone)]
pub struct RemoteFrame {
    pub frame: Arc<DecodedFrame>,
    pub received_at: Instant,
}

/// Latest-wins holder for the remote frame.
///
/// Every write goes through the channel's own lock, so a publish racing a
/// clear resolves to one of the two orders, never a torn state.
pub(crate) struct RemoteFrameSlot {
    tx: watch::Sender<Option<RemoteFrame>>,
}

impl RemoteFrameSlot {
    pub(crate) fn new() -> Self {
        Self { tx: watch::Sender::new(None) }
    }

    /// Publish `frame` unless `generation` has been stopped.
    ///
    /// The check happens under the channel lock, so once `clear` has run for
    /// a stopped generation no frame of that generation can reappear.
    pub(crate) fn publish(&self, frame: DecodedFrame, generation: &CancellationToken) -> bool {
        let frame = Arc::new(frame);
        self.tx.send_if_modified(|current| {
            if generation.is_cancelled() {
                return false;
            }
            *current = Some(RemoteFrame { frame, received_at: Instant::now() });
            true
        })
    }

    pub(crate) fn clear(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    /// Clear the frame if it is older than `window`. Returns true if cleared.
    pub(crate) fn clear_if_stale(&self, window: Duration) -> bool {
        self.tx.send_if_modified(|current| {
            let stale = current
                .as_ref()
                .is_some_and(|remote| remote.received_at.elapsed() > window);
            if stale {
                *current = None;
            }
            stale
        })
    }

    pub(crate) fn current(&self) -> Option<RemoteFrame> {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<RemoteFrame>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelFormat;
    use bytes::Bytes;

    fn frame() -> DecodedFrame {
        DecodedFrame { width: 2, height: 2, pixel_format: PixelFormat::Bgra8, data: Bytes::from_static(&[0; 16]) }
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_generation_cannot_publish() {
        let slot = RemoteFrameSlot::new();
        let generation = CancellationToken::new();

        assert!(slot.publish(frame(), &generation));
        generation.cancel();
        slot.clear();

        assert!(!slot.publish(frame(), &generation));
        assert!(slot.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn staleness_is_strictly_greater_than_window() {
        let slot = RemoteFrameSlot::new();
        let generation = CancellationToken::new();
        slot.publish(frame(), &generation);

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(!slot.clear_if_stale(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(slot.clear_if_stale(Duration::from_secs(1)));
        assert!(slot.current().is_none());
        assert!(!slot.clear_if_stale(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_latest_frame() {
        let slot = RemoteFrameSlot::new();
        let mut rx = slot.subscribe();
        slot.publish(frame(), &CancellationToken::new());

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());
    }
}
