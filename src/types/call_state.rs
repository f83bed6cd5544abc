//! Call state observed from the call-management collaborator

use serde::{Deserialize, Serialize};

/// Snapshot of the externally owned call state.
///
/// The pipeline never mutates this; it re-derives its own state from each
/// snapshot it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallState {
    /// The call is connected and media is flowing.
    pub is_live: bool,
    /// The call carries video (as opposed to audio only).
    pub is_video_call: bool,
    /// The local user has the camera turned on.
    pub is_camera_enabled: bool,
}

impl CallState {
    /// A live video call with the camera switched on.
    pub fn live_video(is_camera_enabled: bool) -> Self {
        Self { is_live: true, is_video_call: true, is_camera_enabled }
    }

    /// Whether the remote video path should be running for this snapshot.
    pub fn wants_video(&self) -> bool {
        self.is_live && self.is_video_call
    }

    /// Whether local capture should be running for this snapshot.
    pub fn wants_capture(&self) -> bool {
        self.wants_video() && self.is_camera_enabled
    }
}

/// Lifecycle state of a [`VideoCallPipeline`](crate::VideoCallPipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Nothing running; no receiver registered with the core.
    Stopped,
    /// Remote frames are decoded; the local camera is off.
    DecodingOnly,
    /// Remote frames are decoded and the local camera is captured and encoded.
    DecodingAndCapturing,
}

impl PipelineState {
    /// Whether the decode path is active.
    pub fn is_decoding(self) -> bool {
        !matches!(self, PipelineState::Stopped)
    }

    /// Whether a capture session exists.
    pub fn is_capturing(self) -> bool {
        matches!(self, PipelineState::DecodingAndCapturing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_call_never_wants_video() {
        let call = CallState { is_live: true, is_video_call: false, is_camera_enabled: true };
        assert!(!call.wants_video());
        assert!(!call.wants_capture());
    }

    #[test]
    fn ringing_video_call_does_not_want_video_yet() {
        let call = CallState { is_live: false, is_video_call: true, is_camera_enabled: true };
        assert!(!call.wants_video());
    }

    #[test]
    fn camera_flag_gates_capture_only() {
        assert!(CallState::live_video(false).wants_video());
        assert!(!CallState::live_video(false).wants_capture());
        assert!(CallState::live_video(true).wants_capture());
    }
}
