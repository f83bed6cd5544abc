//! Local camera capture and hardware encoding
//!
//! A [`CaptureSession`] owns one camera input and one encoder session. Frames
//! are pulled by a dedicated worker task, encoded, framed into start-code
//! payloads and handed to the core with
//! [`CoreBoundary::send_video_frame`].
//!
//! # Failure policy
//!
//! Setup failures never propagate. A missing camera, a frame-rate lock that
//! won't take, or an encoder that can't be created is logged and recorded in
//! [`CaptureSession::camera_error`]; the affected half of the session stays
//! inert while the rest keeps running.

mod slot;
mod worker;

use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::bitstream;
use crate::boundary::CoreBoundary;
use crate::platform::{
    CameraBackend, CameraDevice, EncodeCompletion, EncoderFactory, MediaPlatform,
};
use crate::types::{
    CameraPosition, CaptureConfiguration, EncodedFrame, EncoderSettings, FRAME_RATE, RawFrame,
};
use crate::{MediaError, Result};

use slot::EncoderSlot;
use worker::{CaptureWorker, WorkerCommand, WorkerContext, WorkerHandle};

/// Camera capture plus encoder, feeding the core.
pub struct CaptureSession {
    cameras: Arc<dyn CameraBackend>,
    encoders: Arc<dyn EncoderFactory>,
    core: Arc<dyn CoreBoundary>,
    slot: Arc<EncoderSlot>,
    position: CameraPosition,
    /// Device configured before the worker exists; handed over on start
    pending_device: Option<Box<dyn CameraDevice>>,
    worker: Option<WorkerHandle>,
    preview: Arc<watch::Sender<Option<RawFrame>>>,
    /// Device failures; written by the worker too
    camera_error: Arc<watch::Sender<Option<String>>>,
    encoder_error: watch::Sender<Option<String>>,
}

impl CaptureSession {
    /// Create an idle session for `position`. Nothing is opened until
    /// [`configure`](Self::configure) or [`start`](Self::start).
    pub fn new(core: Arc<dyn CoreBoundary>, platform: &MediaPlatform, position: CameraPosition) -> Self {
        Self {
            cameras: Arc::clone(&platform.cameras),
            encoders: Arc::clone(&platform.encoders),
            core,
            slot: Arc::new(EncoderSlot::new()),
            position,
            pending_device: None,
            worker: None,
            preview: Arc::new(watch::Sender::new(None)),
            camera_error: Arc::new(watch::Sender::new(None)),
            encoder_error: watch::Sender::new(None),
        }
    }

    /// Rebuild the camera input and the encoder for `position`.
    ///
    /// When running, the camera swap happens on the worker so it never
    /// interleaves with frame delivery.
    pub fn configure(&mut self, position: CameraPosition) {
        self.position = position;
        match self.worker.as_ref().filter(|worker| !worker.is_finished()) {
            Some(worker) => worker.send(WorkerCommand::OpenCamera(position)),
            None => {
                self.pending_device = None;
                self.pending_device = open_camera(self.cameras.as_ref(), position, &self.camera_error);
            }
        }
        self.rebuild_encoder(&CaptureConfiguration::for_position(position));
    }

    fn rebuild_encoder(&self, capture: &CaptureConfiguration) {
        if let Some(previous) = self.slot.replace_encoder(None) {
            debug!("Invalidating previous encoder session");
            previous.invalidate();
        }

        let settings = EncoderSettings::for_capture(capture);
        match self.encoders.create(&settings, encode_completion(&self.slot)) {
            Ok(encoder) => {
                debug!(
                    "Encoder ready: {}x{} @ {} bps, key frame every {} frames",
                    settings.width, settings.height, settings.average_bitrate,
                    settings.max_keyframe_interval
                );
                self.slot.replace_encoder(Some(encoder));
                self.encoder_error.send_replace(None);
            }
            Err(e) => {
                error!("Failed to create encoder session: {}", e);
                self.encoder_error.send_replace(Some(e.to_string()));
            }
        }
    }

    /// Start capturing. Calling it on a running session does nothing; a
    /// session whose worker ended on its own is rebuilt and restarted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Capture already running");
            return;
        }
        if self.worker.take().is_some() {
            info!("Capture worker had ended, restarting");
        }

        self.slot.set_core(Some(Arc::clone(&self.core)));

        // Reuse what an earlier configure() prepared for this position
        let prepared = self.slot.encoder().is_some()
            && self.pending_device.as_ref().is_some_and(|device| device.position() == self.position);
        if !prepared {
            self.configure(self.position);
        }

        let device = self.pending_device.take();
        self.spawn_worker(device);
        info!(position = %self.position, "Capture started");
    }

    fn spawn_worker(&mut self, device: Option<Box<dyn CameraDevice>>) {
        let capture = CaptureConfiguration::for_position(self.position);
        self.worker = Some(CaptureWorker::spawn(WorkerContext {
            device,
            cameras: Arc::clone(&self.cameras),
            slot: Arc::clone(&self.slot),
            preview: Arc::clone(&self.preview),
            camera_error: Arc::clone(&self.camera_error),
            frame_duration: capture.frame_duration(),
        }));
    }

    /// Stop capturing and release the encoder. Safe to call repeatedly, and
    /// on a session that was only configured.
    ///
    /// The worker winds down on its own; the encoder and the core reference
    /// are cleared before this returns, so in-flight completions find nothing
    /// to send to.
    pub fn stop(&mut self) {
        let worker = self.worker.take();
        if let Some(worker) = &worker {
            worker.shutdown();
        }

        if let Some(encoder) = self.slot.take_all() {
            encoder.invalidate();
        }
        self.pending_device = None;

        if worker.is_some() {
            info!("Capture stopped");
        }
    }

    /// Flip between front and back cameras. The encoder session is kept.
    ///
    /// If the worker ended on its own, a new one is spawned for the new
    /// camera.
    pub fn switch_camera(&mut self) {
        self.position = self.position.flipped();
        match self.worker.as_ref().map(|worker| (worker, worker.is_finished())) {
            Some((worker, false)) => worker.send(WorkerCommand::OpenCamera(self.position)),
            Some((_, true)) => {
                info!(position = %self.position, "Capture worker had ended, respawning");
                let device = open_camera(self.cameras.as_ref(), self.position, &self.camera_error);
                self.spawn_worker(device);
            }
            None => self.pending_device = None,
        }
        info!(position = %self.position, "Switched camera");
    }

    /// Latest captured frame, for local preview.
    pub fn preview(&self) -> watch::Receiver<Option<RawFrame>> {
        self.preview.subscribe()
    }

    /// Camera currently selected
    pub fn position(&self) -> CameraPosition {
        self.position
    }

    /// Whether a capture worker is alive. False after `stop()` and after
    /// the worker gave up on the camera.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Current setup failure of the camera or the encoder, if any.
    ///
    /// Cleared once the failing part is set up successfully again.
    pub fn camera_error(&self) -> Option<String> {
        let camera = self.camera_error.borrow().clone();
        camera.or_else(|| self.encoder_error.borrow().clone())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("position", &self.position)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Open and configure the camera at `position`.
///
/// An unavailable camera yields `None`. Frame-rate and output configuration
/// failures are recorded but the device is still returned, since it keeps
/// delivering frames at its default settings. A clean setup clears any
/// earlier camera failure.
pub(crate) fn open_camera(
    cameras: &dyn CameraBackend,
    position: CameraPosition,
    camera_error: &watch::Sender<Option<String>>,
) -> Option<Box<dyn CameraDevice>> {
    let mut device = match cameras.open(position) {
        Ok(device) => device,
        Err(e) => {
            error!(%position, "Camera unavailable: {}", e);
            camera_error.send_replace(Some(e.to_string()));
            return None;
        }
    };

    let mut failure: Option<MediaError> = None;
    if let Err(e) = device.lock_frame_rate(FRAME_RATE) {
        warn!(%position, "Could not lock frame rate: {}", e);
        failure = Some(e);
    }

    let config = CaptureConfiguration::for_position(position);
    if let Err(e) = device.configure_output(&config) {
        warn!(%position, "Could not configure capture output: {}", e);
        failure = Some(e);
    }

    camera_error.send_replace(failure.map(|e| e.to_string()));
    debug!(%position, mirrored = config.mirrored, "Camera configured");
    Some(device)
}

/// Completion for a new encoder session.
///
/// Holds the slot weakly; once the session is gone or stopped the completion
/// has nowhere to deliver and returns quietly.
fn encode_completion(slot: &Arc<EncoderSlot>) -> EncodeCompletion {
    let slot: Weak<EncoderSlot> = Arc::downgrade(slot);
    Arc::new(move |result: Result<EncodedFrame>| {
        let Some(slot) = slot.upgrade() else {
            trace!("Capture session gone, dropping encoder output");
            return;
        };
        match result {
            Ok(frame) => forward_encoded(&slot, &frame),
            Err(e) => warn!("Encoder reported an error, dropping frame: {}", e),
        }
    })
}

fn forward_encoded(slot: &EncoderSlot, frame: &EncodedFrame) {
    let Some(payload) = bitstream::frame_encoded(frame) else {
        trace!("Encoded frame produced no NAL units");
        return;
    };
    let Some(core) = slot.core() else {
        trace!("Capture stopped, dropping encoded frame");
        return;
    };
    trace!(
        bytes = payload.len(),
        key_frame = frame.is_key_frame(),
        "Sending encoded frame"
    );
    core.send_video_frame(payload);
}
