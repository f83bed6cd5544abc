//! H.264 NAL unit utilities for the start-code side of the wire
//!
//! - Classify NAL units by header type
//! - Split start-code payloads into NAL units
//! - Convert start-code payloads back to length-prefixed form for decoders
//!   that take parameter sets out of band

use bytes::{BufMut, Bytes, BytesMut};
use std::iter::FusedIterator;

use super::framer::{START_CODE, length_header};
use crate::types::ParameterSets;

/// NAL unit types (5 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// Non-IDR slice (P frame)
    SliceNonIdr,
    /// IDR slice (key frame)
    SliceIdr,
    /// Supplemental enhancement information
    Sei,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
    /// Access unit delimiter
    Aud,
    /// Filler data
    Filler,
    /// Anything else, including data partitions
    Other(u8),
}

impl NalUnitType {
    /// Classify a NAL unit from its header byte.
    pub fn from_header(header: u8) -> Self {
        match header & 0x1F {
            1 => NalUnitType::SliceNonIdr,
            5 => NalUnitType::SliceIdr,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::Aud,
            12 => NalUnitType::Filler,
            n => NalUnitType::Other(n),
        }
    }

    /// Classify a NAL unit from its bytes; `None` for an empty unit.
    pub fn of(unit: &[u8]) -> Option<Self> {
        unit.first().copied().map(Self::from_header)
    }

    /// Check if this NAL unit type indicates a key frame
    pub fn is_keyframe(self) -> bool {
        matches!(self, NalUnitType::SliceIdr)
    }

    /// Check if this is a parameter set (SPS/PPS)
    pub fn is_parameter_set(self) -> bool {
        matches!(self, NalUnitType::Sps | NalUnitType::Pps)
    }
}

fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?.windows(START_CODE.len()).position(|window| window == START_CODE).map(|pos| pos + from)
}

/// Iterator over the NAL units of a start-code payload.
///
/// Bytes before the first marker are ignored, as are empty units between
/// back-to-back markers.
#[derive(Debug, Clone)]
pub struct StartCodeUnits<'a> {
    data: &'a [u8],
    next: Option<usize>,
}

impl<'a> Iterator for StartCodeUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.next?;
            let unit = match find_start_code(self.data, start) {
                Some(end) => {
                    self.next = Some(end + START_CODE.len());
                    &self.data[start..end]
                }
                None => {
                    self.next = None;
                    &self.data[start..]
                }
            };
            if !unit.is_empty() {
                return Some(unit);
            }
        }
    }
}

impl FusedIterator for StartCodeUnits<'_> {}

/// Split a start-code payload into NAL units (markers stripped).
pub fn start_code_units(data: &[u8]) -> StartCodeUnits<'_> {
    let next = find_start_code(data, 0).map(|pos| pos + START_CODE.len());
    StartCodeUnits { data, next }
}

/// Convert a start-code payload to length-prefixed form.
///
/// SPS and PPS units are pulled out and returned separately (the last of each
/// wins); every other unit is written behind a 4-byte big-endian length.
/// Units too long for that header are skipped.
pub fn to_length_prefixed(data: &[u8]) -> (Bytes, Option<ParameterSets>) {
    let mut out = BytesMut::with_capacity(data.len());
    let mut sps = None;
    let mut pps = None;

    for unit in start_code_units(data) {
        match NalUnitType::of(unit) {
            Some(NalUnitType::Sps) => sps = Some(Bytes::copy_from_slice(unit)),
            Some(NalUnitType::Pps) => pps = Some(Bytes::copy_from_slice(unit)),
            _ => {
                if let Some(header) = length_header(unit.len()) {
                    out.put_slice(&header);
                    out.put_slice(unit);
                }
            }
        }
    }

    let sets = match (sps, pps) {
        (None, None) => None,
        (sps, pps) => Some(ParameterSets { sps: sps.unwrap_or_default(), pps: pps.unwrap_or_default() }),
    };
    (out.freeze(), sets)
}

/// Quick check for an IDR unit in a start-code payload.
pub fn contains_keyframe(data: &[u8]) -> bool {
    start_code_units(data).any(|unit| NalUnitType::of(unit).is_some_and(NalUnitType::is_keyframe))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::{length_prefix, to_wire_format};

    fn annex_b(units: &[&[u8]]) -> Vec<u8> {
        let mut data = Vec::new();
        for unit in units {
            data.extend_from_slice(&START_CODE);
            data.extend_from_slice(unit);
        }
        data
    }

    #[test]
    fn nal_type_parsing() {
        assert_eq!(NalUnitType::from_header(0x65), NalUnitType::SliceIdr);
        assert_eq!(NalUnitType::from_header(0x67), NalUnitType::Sps);
        assert_eq!(NalUnitType::from_header(0x68), NalUnitType::Pps);
        assert_eq!(NalUnitType::from_header(0x41), NalUnitType::SliceNonIdr);
        assert_eq!(NalUnitType::from_header(0x62), NalUnitType::Other(2));
        assert!(NalUnitType::of(&[]).is_none());
    }

    #[test]
    fn splits_on_four_byte_marker() {
        let data = annex_b(&[&[0x67, 0x42, 0x00, 0x1E], &[0x68, 0xCE], &[0x65, 0x88, 0x84]]);
        let units: Vec<&[u8]> = start_code_units(&data).collect();
        assert_eq!(units, vec![&[0x67, 0x42, 0x00, 0x1E][..], &[0x68, 0xCE][..], &[0x65, 0x88, 0x84][..]]);
    }

    #[test]
    fn trailing_zero_stays_with_its_unit() {
        let data = annex_b(&[&[0x41, 0x00], &[0x41, 0x01]]);
        let units: Vec<&[u8]> = start_code_units(&data).collect();
        assert_eq!(units, vec![&[0x41, 0x00][..], &[0x41, 0x01][..]]);
    }

    #[test]
    fn leading_garbage_and_empty_units_are_skipped() {
        let mut data = vec![0xAB, 0xCD];
        data.extend_from_slice(&START_CODE);
        data.extend_from_slice(&annex_b(&[&[0x65, 0x01]]));
        let units: Vec<&[u8]> = start_code_units(&data).collect();
        assert_eq!(units, vec![&[0x65, 0x01][..]]);
        assert_eq!(start_code_units(&[0x65, 0x01]).count(), 0);
    }

    #[test]
    fn length_prefixed_conversion_inverts_framer() {
        let sps: &[u8] = &[0x67, 0x42, 0x00, 0x1E];
        let pps: &[u8] = &[0x68, 0xCE, 0x38, 0x80];
        let idr: &[u8] = &[0x65, 0x88, 0x84];
        let sets = ParameterSets::new(Bytes::from_static(sps), Bytes::from_static(pps));

        let original = length_prefix([idr]);
        let wire = to_wire_format(&original, true, Some(&sets)).expect("output");
        let (back, extracted) = to_length_prefixed(&wire);

        assert_eq!(back, original);
        assert_eq!(extracted, Some(sets));
    }

    #[test]
    fn delta_payload_has_no_parameter_sets() {
        let (avcc, sets) = to_length_prefixed(&annex_b(&[&[0x41, 0x9A, 0x01]]));
        assert!(sets.is_none());
        assert_eq!(avcc.as_ref(), &[0, 0, 0, 3, 0x41, 0x9A, 0x01]);
    }

    #[test]
    fn keyframe_detection() {
        assert!(contains_keyframe(&annex_b(&[&[0x67, 0x42], &[0x65, 0x88]])));
        assert!(!contains_keyframe(&annex_b(&[&[0x41, 0x9A, 0x24]])));
        assert!(!contains_keyframe(&annex_b(&[&[0x67, 0x42, 0x00]])));
        assert!(!contains_keyframe(&[]));
    }
}
