//! Core types for the video call pipeline.
//!
//! - [`CallState`] is the externally owned snapshot the pipeline reconciles against
//! - [`PipelineState`] is the pipeline's own derived lifecycle state
//! - [`CaptureConfiguration`] and [`EncoderSettings`] carry the fixed capture and encoder policy
//! - [`RawFrame`], [`EncodedFrame`] and [`DecodedFrame`] are the three frame shapes
//!   moving through capture, encode and decode
//!
//! ## Usage Example
//!
//! ```rust
//! use callvideo::types::{CameraPosition, CaptureConfiguration, EncoderSettings};
//!
//! let capture = CaptureConfiguration::for_position(CameraPosition::Front);
//! let settings = EncoderSettings::for_capture(&capture);
//!
//! assert!(capture.mirrored);
//! assert_eq!((settings.width, settings.height), (720, 1280));
//! assert!(!settings.allow_frame_reordering);
//! ```

mod call_state;
mod capture;
mod frame;

pub use call_state::{CallState, PipelineState};
pub use capture::{
    AVERAGE_BITRATE, CAPTURE_HEIGHT, CAPTURE_WIDTH, CameraPosition, CaptureConfiguration,
    EncoderSettings, FRAME_RATE, MAX_KEYFRAME_INTERVAL, Orientation, PixelFormat, ProfileLevel,
};
pub use frame::{
    DecodedFrame, EncodedFrame, FormatDescription, ParameterSets, RawFrame, SampleAttachments,
};
