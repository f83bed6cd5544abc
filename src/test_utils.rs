//! Mock platform and core implementations for tests and benchmarks
//!
//! Cameras tick at the capture frame rate on the tokio clock, so tests run
//! under a paused clock advance through frames instantly and deterministically.

#![cfg(any(test, feature = "benchmark"))]

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::bitstream::{self, NalUnitType, length_prefix, start_code_units};
use crate::boundary::{CoreBoundary, VideoFrameReceiver};
use crate::platform::{
    CameraBackend, CameraDevice, DecoderFactory, EncodeCompletion, EncoderFactory, MediaPlatform,
    VideoDecoder, VideoEncoder,
};
use crate::types::{
    CAPTURE_HEIGHT, CAPTURE_WIDTH, CameraPosition, CaptureConfiguration, DecodedFrame,
    EncodedFrame, EncoderSettings, FormatDescription, PixelFormat, RawFrame, SampleAttachments,
};
use crate::{MediaError, Result};

/// SPS used by every mock encoder
pub const MOCK_SPS: &[u8] = &[0x67, 0x4D, 0x00, 0x1F, 0x9A, 0x66];
/// PPS used by every mock encoder
pub const MOCK_PPS: &[u8] = &[0x68, 0xEE, 0x3C, 0x80];

const IDR_SLICE: &[u8] = &[0x65, 0x88, 0x84, 0x00, 0x33];
const DELTA_SLICE: &[u8] = &[0x41, 0x9A, 0x24, 0x6C];

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An encoder output frame as the hardware encoder would produce it.
pub fn mock_encoded_frame(key_frame: bool, presentation_time: Duration) -> EncodedFrame {
    let slice = if key_frame { IDR_SLICE } else { DELTA_SLICE };
    EncodedFrame {
        data: length_prefix([slice]),
        presentation_time,
        attachments: Some(SampleAttachments { not_sync: !key_frame }),
        format: Some(Arc::new(FormatDescription {
            width: CAPTURE_WIDTH,
            height: CAPTURE_HEIGHT,
            parameter_sets: vec![Bytes::from_static(MOCK_SPS), Bytes::from_static(MOCK_PPS)],
        })),
    }
}

/// A start-code payload as a remote peer would send it.
pub fn wire_frame(key_frame: bool) -> Bytes {
    bitstream::frame_encoded(&mock_encoded_frame(key_frame, Duration::ZERO))
        .unwrap_or_default()
}

/// Poll `condition` on the tokio clock until it holds.
///
/// # Panics
///
/// When the condition is still false after 30 s of tokio time.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 30s");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Core that records everything sent to it.
#[derive(Default)]
pub struct MockCore {
    sent: Mutex<Vec<Bytes>>,
    receiver: Mutex<Option<Arc<dyn VideoFrameReceiver>>>,
    registrations: AtomicUsize,
}

impl MockCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads handed to `send_video_frame`, in order
    pub fn sent(&self) -> Vec<Bytes> {
        locked(&self.sent).clone()
    }

    /// Number of `set_video_frame_receiver` calls
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Deliver a remote payload to the registered receiver, as the core's
    /// network thread would. Returns false when nothing is registered.
    pub fn deliver(&self, payload: Bytes) -> bool {
        let receiver = locked(&self.receiver).clone();
        match receiver {
            Some(receiver) => {
                receiver.on_video_frame(payload);
                true
            }
            None => false,
        }
    }
}

impl CoreBoundary for MockCore {
    fn set_video_frame_receiver(&self, receiver: Arc<dyn VideoFrameReceiver>) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *locked(&self.receiver) = Some(receiver);
    }

    fn send_video_frame(&self, payload: Bytes) {
        locked(&self.sent).push(payload);
    }
}

#[derive(Default)]
struct CameraState {
    unavailable: Vec<CameraPosition>,
    fail_frame_rate_lock: bool,
    failing_frames: bool,
    opened: Vec<CameraPosition>,
    last_output: Option<CaptureConfiguration>,
}

/// Camera backend producing synthetic frames.
#[derive(Default)]
pub struct MockCameraBackend {
    state: Arc<Mutex<CameraState>>,
}

impl MockCameraBackend {
    pub fn set_unavailable(&self, position: CameraPosition) {
        locked(&self.state).unavailable.push(position);
    }

    pub fn set_fail_frame_rate_lock(&self, fail: bool) {
        locked(&self.state).fail_frame_rate_lock = fail;
    }

    /// Make every `next_frame` call fail
    pub fn set_failing_frames(&self, fail: bool) {
        locked(&self.state).failing_frames = fail;
    }

    /// Positions opened so far, in order
    pub fn opened(&self) -> Vec<CameraPosition> {
        locked(&self.state).opened.clone()
    }

    pub fn last_output(&self) -> Option<CaptureConfiguration> {
        locked(&self.state).last_output.clone()
    }
}

impl CameraBackend for MockCameraBackend {
    fn open(&self, position: CameraPosition) -> Result<Box<dyn CameraDevice>> {
        let mut state = locked(&self.state);
        if state.unavailable.contains(&position) {
            return Err(MediaError::camera_unavailable(position));
        }
        state.opened.push(position);
        Ok(Box::new(MockCamera {
            position,
            state: Arc::clone(&self.state),
            ticker: None,
            frame_index: 0,
        }))
    }
}

struct MockCamera {
    position: CameraPosition,
    state: Arc<Mutex<CameraState>>,
    ticker: Option<Interval>,
    frame_index: u64,
}

#[async_trait::async_trait]
impl CameraDevice for MockCamera {
    fn position(&self) -> CameraPosition {
        self.position
    }

    fn lock_frame_rate(&mut self, fps: u32) -> Result<()> {
        if locked(&self.state).fail_frame_rate_lock {
            return Err(MediaError::frame_rate_lock(fps, "format does not support the range"));
        }
        Ok(())
    }

    fn configure_output(&mut self, config: &CaptureConfiguration) -> Result<()> {
        locked(&self.state).last_output = Some(config.clone());
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if locked(&self.state).failing_frames {
            return Err(MediaError::capture_output("sensor read failed"));
        }

        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(Duration::from_secs(1) / crate::types::FRAME_RATE);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        ticker.tick().await;

        let index = self.frame_index;
        self.frame_index += 1;
        Ok(Some(RawFrame {
            data: Bytes::from(vec![index as u8; 16]),
            width: CAPTURE_WIDTH,
            height: CAPTURE_HEIGHT,
            pixel_format: PixelFormat::Nv12FullRange,
            presentation_time: Duration::from_secs(1) / crate::types::FRAME_RATE * index as u32,
        }))
    }
}

/// Encoder that completes synchronously with canned H.264 output.
pub struct MockEncoder {
    on_output: Option<EncodeCompletion>,
    keyframe_interval: u64,
    frames: AtomicU64,
    invalidations: AtomicUsize,
}

impl MockEncoder {
    fn new(on_output: EncodeCompletion, keyframe_interval: u32) -> Self {
        Self {
            on_output: Some(on_output),
            keyframe_interval: u64::from(keyframe_interval.max(1)),
            frames: AtomicU64::new(0),
            invalidations: AtomicUsize::new(0),
        }
    }

    /// Encoder with no completion attached
    pub fn detached() -> Self {
        Self {
            on_output: None,
            keyframe_interval: 1,
            frames: AtomicU64::new(0),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Fire the completion as a hardware encoder still draining its queue
    /// would, regardless of invalidation.
    pub fn complete_late(&self) {
        if let Some(on_output) = &self.on_output {
            on_output(Ok(mock_encoded_frame(true, Duration::ZERO)));
        }
    }
}

impl VideoEncoder for MockEncoder {
    fn encode(&self, frame: RawFrame, _duration: Duration) -> Result<()> {
        if self.invalidations() > 0 {
            return Err(MediaError::encode("session invalidated"));
        }
        let index = self.frames.fetch_add(1, Ordering::SeqCst);
        if let Some(on_output) = &self.on_output {
            let key_frame = index % self.keyframe_interval == 0;
            on_output(Ok(mock_encoded_frame(key_frame, frame.presentation_time)));
        }
        Ok(())
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Encoder factory recording every session it creates.
#[derive(Default)]
pub struct MockEncoderFactory {
    failing: AtomicBool,
    encoders: Mutex<Vec<Arc<MockEncoder>>>,
    last_settings: Mutex<Option<EncoderSettings>>,
}

impl MockEncoderFactory {
    pub fn set_failing(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// Number of sessions created
    pub fn created(&self) -> usize {
        locked(&self.encoders).len()
    }

    pub fn encoder(&self, index: usize) -> Option<Arc<MockEncoder>> {
        locked(&self.encoders).get(index).cloned()
    }

    pub fn last_settings(&self) -> Option<EncoderSettings> {
        locked(&self.last_settings).clone()
    }
}

impl EncoderFactory for MockEncoderFactory {
    fn create(
        &self,
        settings: &EncoderSettings,
        on_output: EncodeCompletion,
    ) -> Result<Arc<dyn VideoEncoder>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MediaError::encoder_creation("hardware encoder unavailable"));
        }
        *locked(&self.last_settings) = Some(settings.clone());
        let encoder = Arc::new(MockEncoder::new(on_output, settings.max_keyframe_interval));
        locked(&self.encoders).push(Arc::clone(&encoder));
        Ok(encoder)
    }
}

/// Decoder producing one image per payload that carries a slice.
struct MockDecoder;

impl VideoDecoder for MockDecoder {
    fn decode(&mut self, payload: &[u8]) -> Result<Option<DecodedFrame>> {
        if payload.is_empty() {
            return Err(MediaError::decode("empty payload"));
        }
        let has_slice = start_code_units(payload).any(|unit| {
            matches!(NalUnitType::of(unit), Some(NalUnitType::SliceIdr | NalUnitType::SliceNonIdr))
        });
        if !has_slice {
            return Ok(None);
        }
        Ok(Some(DecodedFrame {
            width: CAPTURE_WIDTH,
            height: CAPTURE_HEIGHT,
            pixel_format: PixelFormat::Bgra8,
            data: Bytes::copy_from_slice(payload),
        }))
    }
}

#[derive(Default)]
pub struct MockDecoderFactory {
    failing: AtomicBool,
    created: AtomicUsize,
}

impl MockDecoderFactory {
    pub fn set_failing(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl DecoderFactory for MockDecoderFactory {
    fn create(&self) -> Result<Box<dyn VideoDecoder>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MediaError::decoder_creation("no hardware decoder"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDecoder))
    }
}

/// A full set of mocks with handles kept for inspection.
pub struct MockPlatform {
    pub core: Arc<MockCore>,
    pub cameras: Arc<MockCameraBackend>,
    pub encoders: Arc<MockEncoderFactory>,
    pub decoders: Arc<MockDecoderFactory>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            core: Arc::new(MockCore::new()),
            cameras: Arc::new(MockCameraBackend::default()),
            encoders: Arc::new(MockEncoderFactory::default()),
            decoders: Arc::new(MockDecoderFactory::default()),
        }
    }

    pub fn platform(&self) -> MediaPlatform {
        MediaPlatform::new(self.cameras.clone(), self.encoders.clone(), self.decoders.clone())
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}
