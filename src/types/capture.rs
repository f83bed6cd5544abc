//! Capture and encoder configuration
//!
//! The encoder policy is fixed: the downstream consumer has no reordering
//! buffer and the peer relies on periodic key frames to resynchronize.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Output width after the capture connection rotates to portrait.
pub const CAPTURE_WIDTH: u32 = 720;
/// Output height after the capture connection rotates to portrait.
pub const CAPTURE_HEIGHT: u32 = 1280;
/// Capture and encode frame rate.
pub const FRAME_RATE: u32 = 30;
/// Average encoder bitrate in bits per second.
pub const AVERAGE_BITRATE: u32 = 1_500_000;
/// Maximum distance between key frames, in frames (2 s at 30 fps).
pub const MAX_KEYFRAME_INTERVAL: u32 = 60;

/// Which camera to capture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    /// User-facing camera
    #[default]
    Front,
    /// World-facing camera
    Back,
}

impl CameraPosition {
    /// The opposite camera.
    pub fn flipped(self) -> Self {
        match self {
            CameraPosition::Front => CameraPosition::Back,
            CameraPosition::Back => CameraPosition::Front,
        }
    }

    /// Front-facing capture is mirrored so the preview behaves like a mirror.
    pub fn is_mirrored(self) -> bool {
        matches!(self, CameraPosition::Front)
    }
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraPosition::Front => f.write_str("front"),
            CameraPosition::Back => f.write_str("back"),
        }
    }
}

/// Pixel layout of raw and decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Bi-planar 4:2:0 Y'CbCr, full range (NV12)
    Nv12FullRange,
    /// Packed 8-bit BGRA
    Bgra8,
    /// Packed 8-bit RGBA
    Rgba8,
}

/// Rotation applied on the capture connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Pixels rotated so the long edge is vertical
    Portrait,
    /// Sensor-native orientation
    LandscapeRight,
}

/// Full description of how a camera device must be configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    /// Camera to open
    pub position: CameraPosition,
    /// Output width in pixels, after rotation
    pub width: u32,
    /// Output height in pixels, after rotation
    pub height: u32,
    /// Locked frame rate
    pub frame_rate: u32,
    /// Output pixel format
    pub pixel_format: PixelFormat,
    /// Drop frames the consumer is too slow to take instead of queueing them
    pub discard_late_frames: bool,
    /// Rotation on the capture connection
    pub orientation: Orientation,
    /// Horizontal mirroring on the capture connection
    pub mirrored: bool,
}

impl CaptureConfiguration {
    /// The fixed capture configuration for a camera position.
    pub fn for_position(position: CameraPosition) -> Self {
        Self {
            position,
            width: CAPTURE_WIDTH,
            height: CAPTURE_HEIGHT,
            frame_rate: FRAME_RATE,
            pixel_format: PixelFormat::Nv12FullRange,
            discard_late_frames: true,
            orientation: Orientation::Portrait,
            mirrored: position.is_mirrored(),
        }
    }

    /// Nominal duration of one frame.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

/// Encoder profile and level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileLevel {
    /// H.264 Main profile, level chosen by the encoder
    H264MainAutoLevel,
    /// H.264 Baseline profile, level chosen by the encoder
    H264BaselineAutoLevel,
}

/// Settings handed to the platform encoder factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Encoded width in pixels
    pub width: u32,
    /// Encoded height in pixels
    pub height: u32,
    /// Profile and level
    pub profile: ProfileLevel,
    /// Favor latency over compression efficiency
    pub real_time: bool,
    /// Average bitrate in bits per second
    pub average_bitrate: u32,
    /// Maximum frames between key frames
    pub max_keyframe_interval: u32,
    /// B-frames / out-of-order output; must stay off
    pub allow_frame_reordering: bool,
    /// Duration attached to every submitted frame
    pub frame_duration: Duration,
}

impl EncoderSettings {
    /// Encoder settings matching the rotated output of `capture`.
    pub fn for_capture(capture: &CaptureConfiguration) -> Self {
        Self {
            width: capture.width,
            height: capture.height,
            frame_duration: capture.frame_duration(),
            ..Self::default()
        }
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            width: CAPTURE_WIDTH,
            height: CAPTURE_HEIGHT,
            profile: ProfileLevel::H264MainAutoLevel,
            real_time: true,
            average_bitrate: AVERAGE_BITRATE,
            max_keyframe_interval: MAX_KEYFRAME_INTERVAL,
            allow_frame_reordering: false,
            frame_duration: Duration::from_secs(1) / FRAME_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirroring_follows_position() {
        assert!(CaptureConfiguration::for_position(CameraPosition::Front).mirrored);
        assert!(!CaptureConfiguration::for_position(CameraPosition::Back).mirrored);
    }

    #[test]
    fn capture_is_portrait_720p_at_30fps() {
        let config = CaptureConfiguration::for_position(CameraPosition::Back);
        assert_eq!((config.width, config.height), (720, 1280));
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.orientation, Orientation::Portrait);
        assert!(config.discard_late_frames);
        assert_eq!(config.pixel_format, PixelFormat::Nv12FullRange);
    }

    #[test]
    fn encoder_dimensions_match_capture_for_both_cameras() {
        for position in [CameraPosition::Front, CameraPosition::Back] {
            let capture = CaptureConfiguration::for_position(position);
            let settings = EncoderSettings::for_capture(&capture);
            assert_eq!((settings.width, settings.height), (capture.width, capture.height));
        }
    }

    #[test]
    fn encoder_policy_is_fixed() {
        let settings = EncoderSettings::default();
        assert!(settings.real_time);
        assert!(!settings.allow_frame_reordering);
        assert_eq!(settings.average_bitrate, 1_500_000);
        assert_eq!(settings.max_keyframe_interval, 60);
        assert_eq!(settings.profile, ProfileLevel::H264MainAutoLevel);
    }

    #[test]
    fn position_flips_and_displays() {
        assert_eq!(CameraPosition::Front.flipped(), CameraPosition::Back);
        assert_eq!(CameraPosition::Back.flipped(), CameraPosition::Front);
        assert_eq!(CameraPosition::Back.to_string(), "back");
    }
}
