//! Error types for the video call media pipeline.
//!
//! Nothing in the pipeline is fatal to the process. Errors exist so that the
//! failing subsystem can log a precise reason and degrade: a setup failure
//! leaves capture or decode inert, a transient failure drops one frame.
//!
//! ## Error Classes
//!
//! - **Setup**: camera unavailable, frame-rate lock, output configuration,
//!   encoder or decoder creation, missing core boundary
//! - **Transient**: a single frame failed to encode or decode
//! - **Configuration**: pipeline configuration could not be read or is invalid
//!
//! ```rust
//! use callvideo::{CameraPosition, ErrorClass, MediaError};
//!
//! let error = MediaError::camera_unavailable(CameraPosition::Front);
//! assert_eq!(error.class(), ErrorClass::Setup);
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::CameraPosition;

/// Result type alias for pipeline operations.
pub type Result<T, E = MediaError> = std::result::Result<T, E>;

/// Coarse classification used to decide how a failure degrades the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The affected subsystem stays inert for the rest of its lifetime.
    Setup,
    /// One frame is dropped; the pipeline continues unaffected.
    Transient,
    /// Configuration input was rejected.
    Configuration,
}

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MediaError {
    #[error("No {position} camera available")]
    CameraUnavailable { position: CameraPosition },

    #[error("Failed to lock camera to {fps} fps: {reason}")]
    FrameRateLock { fps: u32, reason: String },

    #[error("Capture output configuration failed: {reason}")]
    CaptureOutput { reason: String },

    #[error("Encoder session creation failed: {reason}")]
    EncoderCreation {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Frame encode failed: {reason}")]
    Encode { reason: String },

    #[error("Decoder creation failed: {reason}")]
    DecoderCreation { reason: String },

    #[error("Frame decode failed: {reason}")]
    Decode { reason: String },

    #[error("Core boundary not configured")]
    NotConfigured,

    #[error("Invalid configuration in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MediaError {
    /// Returns the degradation class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            MediaError::CameraUnavailable { .. }
            | MediaError::FrameRateLock { .. }
            | MediaError::CaptureOutput { .. }
            | MediaError::EncoderCreation { .. }
            | MediaError::DecoderCreation { .. }
            | MediaError::NotConfigured => ErrorClass::Setup,
            MediaError::Encode { .. } | MediaError::Decode { .. } => ErrorClass::Transient,
            MediaError::Config { .. } | MediaError::File { .. } => ErrorClass::Configuration,
        }
    }

    /// Whether the failure only costs a single frame.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MediaError::CameraUnavailable { .. } => vec![
                "Check camera permission for the application",
                "Verify no other application holds the camera",
                "Try switching to the other camera",
            ],
            MediaError::FrameRateLock { .. } => vec![
                "Capture continues at the device default frame rate",
                "Check the device supports 30 fps at the capture preset",
            ],
            MediaError::CaptureOutput { .. } => vec![
                "Verify the device supports the NV12 output format",
                "Restart capture by toggling the camera",
            ],
            MediaError::EncoderCreation { .. } => vec![
                "Check hardware encoder availability",
                "Close other applications using the video encoder",
                "Restart capture by toggling the camera",
            ],
            MediaError::Encode { .. } => vec![
                "The frame was dropped; the next key frame resynchronizes the peer",
            ],
            MediaError::DecoderCreation { .. } => vec![
                "Check hardware decoder availability",
                "Remote video stays hidden until the call restarts",
            ],
            MediaError::Decode { .. } => vec![
                "The frame was dropped; decoding resumes at the next key frame",
            ],
            MediaError::NotConfigured => vec![
                "Call configure() with the core handle at startup",
            ],
            MediaError::Config { .. } => vec![
                "Check configuration key names and value ranges",
                "Remove the key to fall back to the default",
            ],
            MediaError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for a missing camera device.
    pub fn camera_unavailable(position: CameraPosition) -> Self {
        MediaError::CameraUnavailable { position }
    }

    /// Helper constructor for frame-rate lock failures.
    pub fn frame_rate_lock(fps: u32, reason: impl Into<String>) -> Self {
        MediaError::FrameRateLock { fps, reason: reason.into() }
    }

    /// Helper constructor for capture output failures.
    pub fn capture_output(reason: impl Into<String>) -> Self {
        MediaError::CaptureOutput { reason: reason.into() }
    }

    /// Helper constructor for encoder creation failures.
    pub fn encoder_creation(reason: impl Into<String>) -> Self {
        MediaError::EncoderCreation { reason: reason.into(), source: None }
    }

    /// Helper constructor for encoder creation failures with source.
    pub fn encoder_creation_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        MediaError::EncoderCreation { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for per-frame encode failures.
    pub fn encode(reason: impl Into<String>) -> Self {
        MediaError::Encode { reason: reason.into() }
    }

    /// Helper constructor for decoder creation failures.
    pub fn decoder_creation(reason: impl Into<String>) -> Self {
        MediaError::DecoderCreation { reason: reason.into() }
    }

    /// Helper constructor for per-frame decode failures.
    pub fn decode(reason: impl Into<String>) -> Self {
        MediaError::Decode { reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        MediaError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        MediaError::File { path, source }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for MediaError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        MediaError::Config { context: "pipeline YAML".to_string(), details: err.to_string() }
    }
}
