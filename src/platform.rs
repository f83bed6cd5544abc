//! Platform media capabilities
//!
//! The pipeline never talks to a camera, encoder or decoder SDK directly.
//! Platform shells implement these traits and hand them over bundled in a
//! [`MediaPlatform`].

use std::sync::Arc;
use std::time::Duration;

use crate::types::{
    CameraPosition, CaptureConfiguration, DecodedFrame, EncodedFrame, EncoderSettings, RawFrame,
};
use crate::Result;

/// An opened camera device.
///
/// Owned by a capture worker; `next_frame` is only ever called from that
/// worker, so frames are consumed strictly in order.
#[async_trait::async_trait]
pub trait CameraDevice: Send + 'static {
    /// Position this device was opened for
    fn position(&self) -> CameraPosition;

    /// Lock the device to a fixed frame rate (min and max frame duration equal)
    fn lock_frame_rate(&mut self, fps: u32) -> Result<()>;

    /// Apply output format, late-frame policy, rotation and mirroring
    fn configure_output(&mut self, config: &CaptureConfiguration) -> Result<()>;

    /// Wait for the next captured frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - New frame available
    /// - `Ok(None)` - Device stopped delivering (normal termination)
    /// - `Err(e)` - Transient capture error
    ///
    /// With late-frame discarding enabled, frames that arrive while the
    /// caller is busy are dropped by the device rather than queued.
    async fn next_frame(&mut self) -> Result<Option<RawFrame>>;
}

/// Source of camera devices.
pub trait CameraBackend: Send + Sync + 'static {
    /// Open the built-in wide-angle camera at `position`
    fn open(&self, position: CameraPosition) -> Result<Box<dyn CameraDevice>>;
}

/// Completion callback for encoder output.
///
/// Invoked asynchronously, on a thread chosen by the encoder, possibly
/// concurrently with teardown of the session that created the encoder.
pub type EncodeCompletion = Arc<dyn Fn(Result<EncodedFrame>) + Send + Sync>;

/// A live hardware encoder session.
pub trait VideoEncoder: Send + Sync + 'static {
    /// Submit one frame; output arrives through the completion callback.
    ///
    /// An `Err` here means the frame was rejected outright.
    fn encode(&self, frame: RawFrame, duration: Duration) -> Result<()>;

    /// Tear the session down; no completion fires after this returns.
    fn invalidate(&self);
}

/// Source of encoder sessions.
pub trait EncoderFactory: Send + Sync + 'static {
    /// Create and prepare an encoder with the given settings.
    fn create(
        &self,
        settings: &EncoderSettings,
        on_output: EncodeCompletion,
    ) -> Result<Arc<dyn VideoEncoder>>;
}

/// A decoder turning start-code payloads into images.
///
/// Owned by a decode worker and fed in arrival order. `Ok(None)` means the
/// payload was consumed without producing an image yet (e.g. a lone
/// parameter-set payload).
pub trait VideoDecoder: Send + 'static {
    /// Decode one start-code payload
    fn decode(&mut self, payload: &[u8]) -> Result<Option<DecodedFrame>>;
}

/// Source of decoders.
pub trait DecoderFactory: Send + Sync + 'static {
    /// Create a decoder for a new remote stream
    fn create(&self) -> Result<Box<dyn VideoDecoder>>;
}

/// The platform capabilities a pipeline needs.
#[derive(Clone)]
pub struct MediaPlatform {
    /// Camera devices
    pub cameras: Arc<dyn CameraBackend>,
    /// Encoder sessions
    pub encoders: Arc<dyn EncoderFactory>,
    /// Decoders
    pub decoders: Arc<dyn DecoderFactory>,
}

impl MediaPlatform {
    /// Bundle platform capabilities.
    pub fn new(
        cameras: Arc<dyn CameraBackend>,
        encoders: Arc<dyn EncoderFactory>,
        decoders: Arc<dyn DecoderFactory>,
    ) -> Self {
        Self { cameras, encoders, decoders }
    }
}

impl std::fmt::Debug for MediaPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlatform").finish_non_exhaustive()
    }
}
