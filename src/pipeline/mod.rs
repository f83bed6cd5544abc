//! Call-level video pipeline
//!
//! [`VideoCallPipeline`] ties local capture and remote decoding to the call
//! state. The host feeds it every call-state snapshot and reads the remote
//! frame and the capture session back for display.
//!
//! ```text
//!  camera ─▶ CaptureSession ─▶ encoder ─▶ framer ─▶ core.send_video_frame
//!  core ─▶ DecodeSink ─▶ decoder ─▶ remote frame ◀─ watchdog
//! ```
//!
//! All methods take `&mut self` and are meant to be called from one owning
//! context inside a tokio runtime. None of them block on the workers.

mod remote;
mod watchdog;


use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::boundary::CoreBoundary;
use crate::capture::CaptureSession;
use crate::config::PipelineConfig;
use crate::decode::DecodeSink;
use crate::platform::MediaPlatform;
use crate::types::{CallState, CameraPosition, DecodedFrame, PipelineState};
use crate::MediaError;

pub use remote::RemoteFrame;
use remote::RemoteFrameSlot;
use watchdog::Watchdog;

/// The decode side of a started pipeline.
struct ActiveCall {
    sink: Arc<DecodeSink>,
    watchdog: Watchdog,
    /// Cancelled on stop; frames decoded for a stopped generation are dropped
    generation: CancellationToken,
}

/// Video pipeline for one call.
///
/// # Example
///
/// ```rust,ignore
/// let mut pipeline = VideoCallPipeline::new(platform, PipelineConfig::default());
/// pipeline.configure(core);
///
/// // On every call-state change:
/// pipeline.sync_with_call_state(Some(&call_state));
///
/// if let Some(remote) = pipeline.remote_frame() {
///     render(&remote);
/// }
/// ```
pub struct VideoCallPipeline {
    config: PipelineConfig,
    platform: MediaPlatform,
    core: Option<Arc<dyn CoreBoundary>>,
    active: Option<ActiveCall>,
    capture: Option<CaptureSession>,
    camera_position: CameraPosition,
    remote: Arc<RemoteFrameSlot>,
}

impl VideoCallPipeline {
    pub fn new(platform: MediaPlatform, config: PipelineConfig) -> Self {
        Self {
            camera_position: config.initial_camera,
            config,
            platform,
            core: None,
            active: None,
            capture: None,
            remote: Arc::new(RemoteFrameSlot::new()),
        }
    }

    /// Store the core handle used by the next [`start`](Self::start) and
    /// capture session. Replaces any previous handle.
    pub fn configure(&mut self, core: Arc<dyn CoreBoundary>) {
        self.core = Some(core);
    }

    /// Start remote decoding. Does nothing if already started; logs and does
    /// nothing if no core has been configured.
    pub fn start(&mut self) {
        if self.active.is_some() {
            debug!("Pipeline already decoding");
            return;
        }
        let Some(core) = self.core.clone() else {
            warn!("Cannot start video pipeline: {}", MediaError::NotConfigured);
            return;
        };

        let generation = CancellationToken::new();
        let on_decoded = {
            let remote = Arc::clone(&self.remote);
            let generation = generation.clone();
            Box::new(move |frame: DecodedFrame| {
                remote.publish(frame, &generation);
            })
        };

        let sink = DecodeSink::spawn(
            self.platform.decoders.as_ref(),
            self.config.decode_queue_depth,
            on_decoded,
        );
        core.set_video_frame_receiver(sink.clone());

        let watchdog = Watchdog::arm(
            Arc::clone(&self.remote),
            self.config.watchdog_interval(),
            self.config.staleness_window(),
            generation.child_token(),
        );

        self.active = Some(ActiveCall { sink, watchdog, generation });
        info!("Video pipeline started");
    }

    /// Reconcile the pipeline with a call-state snapshot.
    ///
    /// No call, an audio call or a call that isn't live stops everything.
    /// Otherwise decoding runs, and capture runs exactly when the camera is
    /// enabled. A capture session whose worker ended on its own is restarted.
    /// Repeating the same snapshot otherwise changes nothing.
    pub fn sync_with_call_state(&mut self, call: Option<&CallState>) {
        let Some(call) = call.filter(|call| call.wants_video()) else {
            self.stop();
            return;
        };

        if self.active.is_none() {
            self.start();
        }
        self.sync_capture(call.wants_capture());
    }

    fn sync_capture(&mut self, wanted: bool) {
        match (wanted, self.capture.as_mut()) {
            (true, Some(capture)) if !capture.is_running() => {
                // The worker gave up on the camera; try again
                capture.start();
                info!(position = %capture.position(), "Local camera restarted");
            }
            (true, None) => {
                let Some(core) = self.core.clone() else {
                    warn!("Cannot start capture: {}", MediaError::NotConfigured);
                    return;
                };
                let mut capture = CaptureSession::new(core, &self.platform, self.camera_position);
                capture.start();
                self.capture = Some(capture);
                info!(position = %self.camera_position, "Local camera on");
            }
            (false, Some(_)) => {
                if let Some(mut capture) = self.capture.take() {
                    capture.stop();
                }
                info!("Local camera off");
            }
            _ => {}
        }
    }

    /// Stop capture and decoding and clear the remote frame.
    pub fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }

        let Some(active) = self.active.take() else {
            return;
        };
        active.generation.cancel();
        active.watchdog.disarm();
        active.sink.close();
        self.remote.clear();
        info!("Video pipeline stopped");
    }

    /// Flip the camera of the running capture session. The choice carries
    /// over to later capture sessions.
    pub fn switch_camera(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            capture.switch_camera();
            self.camera_position = capture.position();
        }
    }

    pub fn state(&self) -> PipelineState {
        match (&self.active, &self.capture) {
            (None, _) => PipelineState::Stopped,
            (Some(_), Some(capture)) if capture.is_running() => PipelineState::DecodingAndCapturing,
            (Some(_), _) => PipelineState::DecodingOnly,
        }
    }

    /// The local capture session, for preview.
    pub fn local_capture_session(&self) -> Option<&CaptureSession> {
        self.capture.as_ref()
    }

    /// The most recent remote frame, if fresh.
    pub fn remote_frame(&self) -> Option<RemoteFrame> {
        self.remote.current()
    }

    /// Stream of remote frame changes. Yields `None` when the remote image is
    /// cleared (stale or stopped). Slow readers only see the latest value.
    pub fn remote_frames(&self) -> impl Stream<Item = Option<Arc<DecodedFrame>>> + Send + use<> {
        WatchStream::new(self.remote.subscribe()).map(|remote| remote.map(|remote| remote.frame))
    }

    pub fn has_remote_video(&self) -> bool {
        self.remote.current().is_some()
    }

    /// Setup failure of the local camera or encoder, if any.
    pub fn camera_error(&self) -> Option<String> {
        self.capture.as_ref().and_then(CaptureSession::camera_error)
    }

    pub fn is_watchdog_armed(&self) -> bool {
        self.active.as_ref().is_some_and(|active| active.watchdog.is_armed())
    }

    /// Camera the next capture session will open.
    pub fn camera_position(&self) -> CameraPosition {
        self.camera_position
    }
}

impl Drop for VideoCallPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for VideoCallPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoCallPipeline")
            .field("state", &self.state())
            .field("camera_position", &self.camera_position)
            .field("configured", &self.core.is_some())
            .finish_non_exhaustive()
    }
}
