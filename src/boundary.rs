//! Foreign-function boundary to the native application core
//!
//! The core owns transport to the remote peer. The pipeline only hands it
//! framed payloads and registers one receiver for the remote side.

use bytes::Bytes;
use std::sync::Arc;

/// Receiver the core calls with compressed remote frames.
///
/// Payloads are in start-code form. Calls may arrive on any core thread and
/// may keep arriving after the pipeline has discarded the receiver, so
/// implementations must swallow late frames instead of asserting.
pub trait VideoFrameReceiver: Send + Sync + 'static {
    /// Deliver one compressed remote frame.
    fn on_video_frame(&self, payload: Bytes);
}

/// Calls consumed from the native core.
pub trait CoreBoundary: Send + Sync + 'static {
    /// Register the active receiver for remote frames, replacing any previous one.
    fn set_video_frame_receiver(&self, receiver: Arc<dyn VideoFrameReceiver>);

    /// Hand one start-code payload to the core for transport.
    ///
    /// Fire and forget; there is no acknowledgement and backpressure is the
    /// core's concern.
    fn send_video_frame(&self, payload: Bytes);
}
