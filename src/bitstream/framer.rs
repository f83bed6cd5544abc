//! Length-prefixed to start-code reframing
//!
//! Hardware encoders emit NAL units behind a 4-byte big-endian length. The
//! core and the remote decoder scan for the `00 00 00 01` marker instead, and
//! have no other way to learn the stream parameters, so every key frame is
//! preceded by the SPS and PPS records.

use bytes::{BufMut, Bytes, BytesMut};
use std::iter::FusedIterator;

use crate::types::{EncodedFrame, ParameterSets};

/// Marker preceding every NAL unit in start-code form.
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Size of the big-endian length header in length-prefixed form.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Iterator over the NAL units of a length-prefixed buffer.
///
/// Stops at the first header that is zero, does not fit, or declares more
/// bytes than remain. Trailing data past that point is dropped.
#[derive(Debug, Clone)]
pub struct LengthPrefixedUnits<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for LengthPrefixedUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        // A header must be followed by at least one byte of payload
        if self.offset + LENGTH_PREFIX_SIZE >= self.data.len() {
            self.offset = self.data.len();
            return None;
        }

        let header_end = self.offset + LENGTH_PREFIX_SIZE;
        let header = <[u8; LENGTH_PREFIX_SIZE]>::try_from(&self.data[self.offset..header_end]).ok()?;
        let unit_len = u32::from_be_bytes(header) as usize;

        if unit_len == 0 || unit_len > self.data.len() - header_end {
            self.offset = self.data.len();
            return None;
        }

        self.offset = header_end + unit_len;
        Some(&self.data[header_end..self.offset])
    }
}

impl FusedIterator for LengthPrefixedUnits<'_> {}

/// Walk the NAL units of a length-prefixed buffer.
pub fn length_prefixed_units(data: &[u8]) -> LengthPrefixedUnits<'_> {
    LengthPrefixedUnits { data, offset: 0 }
}

/// Convert one length-prefixed frame into start-code form.
///
/// On key frames the parameter sets (when supplied) are emitted first, SPS
/// then PPS, each behind its own start code; empty records are skipped.
/// Returns `None` when nothing at all was emitted, which callers treat as
/// "nothing to send".
pub fn to_wire_format(
    frame: &[u8],
    is_key_frame: bool,
    parameter_sets: Option<&ParameterSets>,
) -> Option<Bytes> {
    let prepended = match parameter_sets {
        Some(sets) if is_key_frame => sets.sps.len() + sets.pps.len() + 2 * START_CODE.len(),
        _ => 0,
    };
    let mut out = BytesMut::with_capacity(frame.len() + prepended);

    if let Some(sets) = parameter_sets.filter(|_| is_key_frame) {
        for record in sets.records() {
            if record.is_empty() {
                continue;
            }
            out.put_slice(&START_CODE);
            out.put_slice(record);
        }
    }

    for unit in length_prefixed_units(frame) {
        out.put_slice(&START_CODE);
        out.put_slice(unit);
    }

    if out.is_empty() { None } else { Some(out.freeze()) }
}

/// Frame an encoder output using its own key-frame flag and format description.
pub fn frame_encoded(frame: &EncodedFrame) -> Option<Bytes> {
    let is_key_frame = frame.is_key_frame();
    let parameter_sets = if is_key_frame { frame.parameter_sets() } else { None };
    to_wire_format(&frame.data, is_key_frame, parameter_sets.as_ref())
}

/// Build a length-prefixed buffer from NAL units.
///
/// Units too long for the 4-byte header are skipped.
pub fn length_prefix<I, U>(units: I) -> Bytes
where
    I: IntoIterator<Item = U>,
    U: AsRef<[u8]>,
{
    let mut out = BytesMut::new();
    for unit in units {
        let unit = unit.as_ref();
        if let Some(header) = length_header(unit.len()) {
            out.put_slice(&header);
            out.put_slice(unit);
        }
    }
    out.freeze()
}

/// Big-endian length header for a unit of `len` bytes, `None` past `u32::MAX`.
pub(crate) fn length_header(len: usize) -> Option<[u8; LENGTH_PREFIX_SIZE]> {
    u32::try_from(len).ok().map(u32::to_be_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::start_code_units;
    use crate::types::{FormatDescription, SampleAttachments};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    const SPS: &[u8] = &[0x67, 0x42, 0x00, 0x1E];
    const PPS: &[u8] = &[0x68, 0xCE, 0x38, 0x80];
    const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x00, 0x21];
    const SLICE: &[u8] = &[0x41, 0x9A, 0x24];

    fn parameter_sets() -> ParameterSets {
        ParameterSets::new(Bytes::from_static(SPS), Bytes::from_static(PPS))
    }

    // NAL units without zero bytes cannot contain a start code
    fn arb_nal_unit() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(1u8..=255, 1..64)
    }

    #[test]
    fn key_frame_gets_parameter_sets_first() {
        let frame = length_prefix([IDR]);
        let wire = to_wire_format(&frame, true, Some(&parameter_sets())).expect("output");

        let mut expected = Vec::new();
        for unit in [SPS, PPS, IDR] {
            expected.extend_from_slice(&START_CODE);
            expected.extend_from_slice(unit);
        }
        assert_eq!(wire.as_ref(), expected.as_slice());
    }

    #[test]
    fn delta_frame_ignores_parameter_sets() {
        let frame = length_prefix([SLICE]);
        let wire = to_wire_format(&frame, false, Some(&parameter_sets())).expect("output");
        assert_eq!(wire.as_ref(), [&START_CODE[..], SLICE].concat().as_slice());
    }

    #[test]
    fn empty_parameter_record_is_skipped() {
        let sets = ParameterSets::new(Bytes::from_static(SPS), Bytes::new());
        let wire = to_wire_format(&length_prefix([IDR]), true, Some(&sets)).expect("output");
        let units: Vec<&[u8]> = start_code_units(&wire).collect();
        assert_eq!(units, vec![SPS, IDR]);
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(to_wire_format(&[], false, None).is_none());
        assert!(to_wire_format(&[], true, None).is_none());
    }

    #[test]
    fn empty_input_on_key_frame_still_carries_parameter_sets() {
        let wire = to_wire_format(&[], true, Some(&parameter_sets())).expect("output");
        let units: Vec<&[u8]> = start_code_units(&wire).collect();
        assert_eq!(units, vec![SPS, PPS]);
    }

    #[test]
    fn zero_length_header_stops_the_walk() {
        let mut frame = length_prefix([SLICE]).to_vec();
        frame.extend_from_slice(&[0, 0, 0, 0]);
        frame.extend_from_slice(&length_prefix([IDR]));
        let units: Vec<&[u8]> = length_prefixed_units(&frame).collect();
        assert_eq!(units, vec![SLICE]);
    }

    #[test]
    fn overlong_header_truncates_silently() {
        let mut frame = length_prefix([SLICE]).to_vec();
        frame.extend_from_slice(&100u32.to_be_bytes());
        frame.extend_from_slice(&[0x41, 0x01]);
        let wire = to_wire_format(&frame, false, None).expect("valid prefix");
        assert_eq!(wire.as_ref(), [&START_CODE[..], SLICE].concat().as_slice());
    }

    #[test]
    fn dangling_header_without_payload_is_dropped() {
        let mut frame = length_prefix([SLICE]).to_vec();
        frame.extend_from_slice(&3u32.to_be_bytes());
        let units: Vec<&[u8]> = length_prefixed_units(&frame).collect();
        assert_eq!(units, vec![SLICE]);
    }

    #[test]
    fn garbage_only_input_yields_none() {
        assert!(to_wire_format(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01], false, None).is_none());
        assert!(to_wire_format(&[0x00, 0x00], false, None).is_none());
    }

    #[test]
    fn encoded_frame_uses_attachments_and_format() {
        let format = Arc::new(FormatDescription {
            width: 720,
            height: 1280,
            parameter_sets: vec![Bytes::from_static(SPS), Bytes::from_static(PPS)],
        });
        let mut frame = EncodedFrame {
            data: length_prefix([IDR]),
            presentation_time: Duration::ZERO,
            attachments: Some(SampleAttachments { not_sync: false }),
            format: Some(format),
        };
        let wire = frame_encoded(&frame).expect("output");
        assert_eq!(start_code_units(&wire).count(), 3);

        frame.attachments = Some(SampleAttachments { not_sync: true });
        let wire = frame_encoded(&frame).expect("output");
        assert_eq!(start_code_units(&wire).count(), 1);
    }

    proptest! {
        #[test]
        fn start_code_parse_recovers_units(units in prop::collection::vec(arb_nal_unit(), 1..16)) {
            let frame = length_prefix(&units);
            let wire = to_wire_format(&frame, false, None).expect("non-empty units");
            let parsed: Vec<Vec<u8>> = start_code_units(&wire).map(<[u8]>::to_vec).collect();
            prop_assert_eq!(parsed, units);
        }

        #[test]
        fn key_frames_lead_with_sps_then_pps(units in prop::collection::vec(arb_nal_unit(), 1..8)) {
            let frame = length_prefix(&units);
            let sets = parameter_sets();

            let key = to_wire_format(&frame, true, Some(&sets)).expect("output");
            let parsed: Vec<&[u8]> = start_code_units(&key).collect();
            prop_assert_eq!(parsed.len(), units.len() + 2);
            prop_assert_eq!(parsed[0], SPS);
            prop_assert_eq!(parsed[1], PPS);

            let delta = to_wire_format(&frame, false, Some(&sets)).expect("output");
            let parsed: Vec<&[u8]> = start_code_units(&delta).collect();
            prop_assert!(!parsed.contains(&SPS));
            prop_assert!(!parsed.contains(&PPS));
        }

        #[test]
        fn truncated_tail_keeps_valid_prefix(
            units in prop::collection::vec(arb_nal_unit(), 1..8),
            tail in prop::collection::vec(any::<u8>(), 0..8),
            excess in 1u32..1024,
        ) {
            let mut frame = length_prefix(&units).to_vec();
            frame.extend_from_slice(&(tail.len() as u32 + excess).to_be_bytes());
            frame.extend_from_slice(&tail);

            let wire = to_wire_format(&frame, false, None).expect("valid prefix");
            let parsed: Vec<Vec<u8>> = start_code_units(&wire).map(<[u8]>::to_vec).collect();
            prop_assert_eq!(parsed, units);
        }

        #[test]
        fn arbitrary_input_never_panics(data in prop::collection::vec(any::<u8>(), 0..256), key in any::<bool>()) {
            let sets = parameter_sets();
            let _ = to_wire_format(&data, key, Some(&sets));
            let total: usize = length_prefixed_units(&data).map(|unit| unit.len() + LENGTH_PREFIX_SIZE).sum();
            prop_assert!(total <= data.len());
        }
    }

    #[test]
    fn length_header_is_big_endian() {
        assert_eq!(length_header(0x0102), Some([0x00, 0x00, 0x01, 0x02]));
        assert_eq!(length_header(u32::MAX as usize), Some([0xFF; 4]));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn length_header_rejects_units_past_u32() {
        assert_eq!(length_header(u32::MAX as usize + 1), None);
    }
}
