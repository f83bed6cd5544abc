//! H.264 bitstream framing.
//!
//! The one bit-exact contract of the pipeline lives here: every payload sent
//! to the core is a run of NAL units each preceded by `00 00 00 01`, and key
//! frames carry the SPS and PPS in front of their first slice.
//!
//! ```rust
//! use bytes::Bytes;
//! use callvideo::bitstream::{length_prefix, start_code_units, to_wire_format};
//! use callvideo::types::ParameterSets;
//!
//! let sets = ParameterSets::new(Bytes::from_static(&[0x67, 0x42]), Bytes::from_static(&[0x68, 0xCE]));
//! let frame = length_prefix([&[0x65u8, 0x88, 0x84][..]]);
//!
//! let wire = to_wire_format(&frame, true, Some(&sets)).expect("key frame");
//! let units: Vec<&[u8]> = start_code_units(&wire).collect();
//! assert_eq!(units.len(), 3);
//! assert_eq!(units[0], &[0x67, 0x42]);
//! ```

mod framer;
mod nal;

pub use framer::{
    LENGTH_PREFIX_SIZE, LengthPrefixedUnits, START_CODE, frame_encoded, length_prefix,
    length_prefixed_units, to_wire_format,
};
pub use nal::{NalUnitType, StartCodeUnits, contains_keyframe, start_code_units, to_length_prefixed};
