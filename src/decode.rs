//! Remote video decoding
//!
//! [`DecodeSink`] is the receiver registered with the core. The core calls it
//! on its own threads; payloads are queued to a decode worker task so the
//! core is never blocked, and dropped when the worker falls behind.

use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::boundary::VideoFrameReceiver;
use crate::platform::{DecoderFactory, VideoDecoder};
use crate::types::DecodedFrame;

/// Default number of payloads buffered ahead of the decoder
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Callback receiving every decoded image, in arrival order.
pub type DecodedFrameHandler = Box<dyn FnMut(DecodedFrame) + Send + 'static>;

/// Receiver of remote payloads, feeding a decode worker.
///
/// # Example
///
/// ```rust,ignore
/// let sink = DecodeSink::spawn(decoders.as_ref(), 8, Box::new(|frame| show(frame)));
/// core.set_video_frame_receiver(sink.clone());
/// // ...
/// sink.close();
/// ```
pub struct DecodeSink {
    queue: Mutex<Option<mpsc::Sender<Bytes>>>,
    closed: CancellationToken,
    decoding: bool,
}

impl DecodeSink {
    /// Create the decoder and spawn its worker.
    ///
    /// When the decoder can't be created the sink still accepts payloads and
    /// discards them, so the core can keep delivering without errors.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        decoders: &dyn DecoderFactory,
        queue_depth: usize,
        on_decoded: DecodedFrameHandler,
    ) -> Arc<Self> {
        let closed = CancellationToken::new();

        let queue = match decoders.create() {
            Ok(decoder) => {
                let (tx, rx) = mpsc::channel(queue_depth.max(1));
                tokio::spawn(decode_worker(decoder, rx, on_decoded, closed.clone()));
                Some(tx)
            }
            Err(e) => {
                error!("Failed to create decoder, remote video disabled: {}", e);
                None
            }
        };

        Arc::new(Self {
            decoding: queue.is_some(),
            queue: Mutex::new(queue),
            closed,
        })
    }

    /// Stop accepting payloads and end the worker.
    ///
    /// Payloads still queued are discarded. Safe to call repeatedly.
    pub fn close(&self) {
        self.closed.cancel();
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Whether a decoder is attached (false in degraded mode)
    pub fn is_decoding(&self) -> bool {
        self.decoding && !self.is_closed()
    }
}

impl VideoFrameReceiver for DecodeSink {
    fn on_video_frame(&self, payload: Bytes) {
        let queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone();
        let Some(queue) = queue else {
            trace!(bytes = payload.len(), "Sink closed or degraded, dropping remote frame");
            return;
        };

        match queue.try_send(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(payload)) => {
                debug!(bytes = payload.len(), "Decode queue full, dropping remote frame");
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Decode worker gone, dropping remote frame");
            }
        }
    }
}

impl Drop for DecodeSink {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

impl std::fmt::Debug for DecodeSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeSink")
            .field("decoding", &self.decoding)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn decode_worker(
    mut decoder: Box<dyn VideoDecoder>,
    mut queue: mpsc::Receiver<Bytes>,
    mut on_decoded: DecodedFrameHandler,
    closed: CancellationToken,
) {
    info!("Decode worker started");
    let mut decoded = 0u64;
    let mut dropped = 0u64;

    loop {
        let payload = tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            payload = queue.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };

        match decoder.decode(&payload) {
            Ok(Some(frame)) => {
                decoded += 1;
                trace!("Decoded frame {}: {}x{}", decoded, frame.width, frame.height);
                on_decoded(frame);
            }
            Ok(None) => trace!(bytes = payload.len(), "Payload produced no image"),
            Err(e) => {
                dropped += 1;
                warn!("Dropping undecodable remote frame: {}", e);
            }
        }
    }

    info!("Decode worker ended ({} decoded, {} dropped)", decoded, dropped);
}
