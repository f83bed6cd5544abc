//! Sequential capture worker
//!
//! One task per running capture session. It owns the camera device, pulls
//! frames strictly in order, publishes them for preview and submits them to
//! the encoder. Camera reconfiguration requests are queued onto the same
//! task so they never interleave with frame delivery.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::open_camera;
use super::slot::EncoderSlot;
use crate::Result;
use crate::platform::{CameraBackend, CameraDevice};
use crate::types::{CameraPosition, RawFrame};

/// Consecutive camera errors tolerated before the worker gives up
const MAX_ERRORS: u32 = 10;

/// Work queued onto the capture worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerCommand {
    /// Replace the camera input with the device at this position
    OpenCamera(CameraPosition),
}

/// Everything the worker task owns or shares.
pub(crate) struct WorkerContext {
    pub device: Option<Box<dyn CameraDevice>>,
    pub cameras: Arc<dyn CameraBackend>,
    pub slot: Arc<EncoderSlot>,
    pub preview: Arc<watch::Sender<Option<RawFrame>>>,
    pub camera_error: Arc<watch::Sender<Option<String>>>,
    pub frame_duration: Duration,
}

/// Handle to a running capture worker.
pub(crate) struct WorkerHandle {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Queue a command; a worker that already exited ignores it.
    pub(crate) fn send(&self, command: WorkerCommand) {
        if self.commands.send(command).is_err() {
            debug!(?command, "Capture worker already ended, dropping command");
        }
    }

    /// The worker ended, on request or on its own (camera gave up or
    /// stopped delivering).
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the worker to stop; returns immediately.
    pub(crate) fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawns the capture worker task.
pub(crate) struct CaptureWorker;

impl CaptureWorker {
    /// Spawn the worker for `context`.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(context: WorkerContext) -> WorkerHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let cancel_worker = cancel.clone();

        let task = tokio::spawn(async move {
            Self::run(context, commands_rx, cancel_worker).await;
        });

        WorkerHandle { commands: commands_tx, cancel, task }
    }

    async fn run(
        mut context: WorkerContext,
        mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
        cancel: CancellationToken,
    ) {
        info!(
            position = ?context.device.as_ref().map(|device| device.position()),
            "Capture worker started"
        );
        let mut frame_count = 0u64;
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Capture worker cancelled");
                    break;
                }
                Some(command) = commands.recv() => {
                    Self::apply(&mut context, command);
                    continue;
                }
                result = next_frame(&mut context.device) => result,
            };

            match result {
                Ok(Some(frame)) => {
                    frame_count += 1;
                    error_count = 0;
                    trace!(
                        "Frame {}: pts={:?}, {}x{}",
                        frame_count, frame.presentation_time, frame.width, frame.height
                    );
                    Self::submit(&context, frame);
                }
                Ok(None) => {
                    info!("Camera stopped delivering frames after {}", frame_count);
                    break;
                }
                Err(e) => {
                    // Camera hiccups are transient; only a run of them ends capture
                    error_count += 1;
                    error!("Camera error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many camera errors, stopping capture");
                        context.camera_error.send_replace(Some(e.to_string()));
                        break;
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ... capped at 1.6s
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        // Dropping the device stops the camera
        context.device = None;
        info!("Capture worker ended (captured {} frames)", frame_count);
    }

    fn apply(context: &mut WorkerContext, command: WorkerCommand) {
        match command {
            WorkerCommand::OpenCamera(position) => {
                debug!(%position, "Reconfiguring camera input");
                // Remove the old input before adding the new one
                context.device = None;
                context.device =
                    open_camera(context.cameras.as_ref(), position, &context.camera_error);
            }
        }
    }

    fn submit(context: &WorkerContext, frame: RawFrame) {
        context.preview.send_replace(Some(frame.clone()));

        let Some(encoder) = context.slot.encoder() else {
            trace!("No encoder session, dropping frame");
            return;
        };
        if let Err(e) = encoder.encode(frame, context.frame_duration) {
            warn!("Encode failed, dropping frame: {}", e);
        }
    }
}

async fn next_frame(device: &mut Option<Box<dyn CameraDevice>>) -> Result<Option<RawFrame>> {
    match device {
        Some(device) => device.next_frame().await,
        // No input attached; wait for a command or cancellation
        None => std::future::pending().await,
    }
}
