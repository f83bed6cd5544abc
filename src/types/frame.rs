//! Frame types flowing through the pipeline
//!
//! Payload bytes are [`Bytes`] so frames can be handed between the capture
//! worker, encoder completions and the core without copying.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use super::PixelFormat;

/// One image delivered by the camera.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Pixel data in `pixel_format` layout
    pub data: Bytes,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel layout
    pub pixel_format: PixelFormat,
    /// Presentation timestamp relative to the capture clock origin
    pub presentation_time: Duration,
}

/// The two out-of-band parameter records describing the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSets {
    /// Sequence parameter set NAL unit (without start code)
    pub sps: Bytes,
    /// Picture parameter set NAL unit (without start code)
    pub pps: Bytes,
}

impl ParameterSets {
    /// Create a parameter set pair.
    pub fn new(sps: impl Into<Bytes>, pps: impl Into<Bytes>) -> Self {
        Self { sps: sps.into(), pps: pps.into() }
    }

    /// Records in emission order.
    pub fn records(&self) -> [&Bytes; 2] {
        [&self.sps, &self.pps]
    }
}

/// Encoder format description attached to compressed output.
///
/// Holds the parameter-set records by index, the way hardware encoders expose
/// them: index 0 is the SPS, index 1 the PPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    /// Coded width
    pub width: u32,
    /// Coded height
    pub height: u32,
    /// Parameter-set records by index
    pub parameter_sets: Vec<Bytes>,
}

impl FormatDescription {
    /// Parameter set at `index`, if present and non-empty.
    pub fn parameter_set_at(&self, index: usize) -> Option<&Bytes> {
        self.parameter_sets.get(index).filter(|record| !record.is_empty())
    }

    /// The SPS/PPS pair, if either record is present.
    ///
    /// A missing record is represented as empty and skipped by the framer.
    pub fn h264_parameter_sets(&self) -> Option<ParameterSets> {
        let sps = self.parameter_set_at(0).cloned();
        let pps = self.parameter_set_at(1).cloned();
        if sps.is_none() && pps.is_none() {
            return None;
        }
        Some(ParameterSets { sps: sps.unwrap_or_default(), pps: pps.unwrap_or_default() })
    }
}

/// Per-sample attachments reported by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleAttachments {
    /// Set when the sample depends on earlier samples
    pub not_sync: bool,
}

/// One compressed frame as produced by the encoder.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// NAL units in length-prefixed form
    pub data: Bytes,
    /// Presentation timestamp copied from the raw frame
    pub presentation_time: Duration,
    /// Sample attachments; absent when the encoder reported none
    pub attachments: Option<SampleAttachments>,
    /// Format description; carries the parameter sets
    pub format: Option<Arc<FormatDescription>>,
}

impl EncodedFrame {
    /// A frame is a key frame when attachments exist and do not mark it
    /// as depending on earlier samples.
    pub fn is_key_frame(&self) -> bool {
        self.attachments.is_some_and(|attachments| !attachments.not_sync)
    }

    /// Parameter sets from the attached format description.
    pub fn parameter_sets(&self) -> Option<ParameterSets> {
        self.format.as_ref().and_then(|format| format.h264_parameter_sets())
    }
}

/// One displayable image produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel layout
    pub pixel_format: PixelFormat,
    /// Pixel data
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(attachments: Option<SampleAttachments>) -> EncodedFrame {
        EncodedFrame {
            data: Bytes::new(),
            presentation_time: Duration::ZERO,
            attachments,
            format: None,
        }
    }

    #[test]
    fn key_frame_requires_attachments_without_not_sync() {
        assert!(encoded(Some(SampleAttachments { not_sync: false })).is_key_frame());
        assert!(!encoded(Some(SampleAttachments { not_sync: true })).is_key_frame());
        assert!(!encoded(None).is_key_frame());
    }

    #[test]
    fn parameter_sets_read_by_index() {
        let format = FormatDescription {
            width: 720,
            height: 1280,
            parameter_sets: vec![Bytes::from_static(&[0x67, 0x42]), Bytes::from_static(&[0x68])],
        };
        let sets = format.h264_parameter_sets().expect("both records present");
        assert_eq!(sets.sps.as_ref(), &[0x67, 0x42]);
        assert_eq!(sets.pps.as_ref(), &[0x68]);
    }

    #[test]
    fn missing_records_yield_no_parameter_sets() {
        let format = FormatDescription { width: 720, height: 1280, parameter_sets: vec![] };
        assert!(format.h264_parameter_sets().is_none());

        let only_sps = FormatDescription {
            width: 720,
            height: 1280,
            parameter_sets: vec![Bytes::from_static(&[0x67])],
        };
        let sets = only_sps.h264_parameter_sets().expect("sps present");
        assert!(sets.pps.is_empty());
    }
}
