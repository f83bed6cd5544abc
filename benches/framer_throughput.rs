//! Benchmarks for bitstream framing on the encode and decode paths
//!
//! Every encoded frame passes through `to_wire_format` on the encoder's
//! completion thread, so framing cost adds directly to send latency.
//! - Key frames with SPS/PPS prepended
//! - Delta frames split into several slices
//! - Start-code parsing on the receive side

use bytes::Bytes;
use callvideo::bitstream::{length_prefix, start_code_units, to_length_prefixed, to_wire_format};
use callvideo::types::ParameterSets;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn parameter_sets() -> ParameterSets {
    ParameterSets::new(
        Bytes::from_static(&[0x67, 0x4D, 0x00, 0x1F, 0x9A, 0x66, 0x02, 0x80]),
        Bytes::from_static(&[0x68, 0xEE, 0x3C, 0x80]),
    )
}

/// A frame of `slices` slices totalling roughly `size` bytes.
fn encoded_frame(key_frame: bool, slices: usize, size: usize) -> Bytes {
    let header = if key_frame { 0x65 } else { 0x41 };
    let per_slice = (size / slices).max(2);
    let units: Vec<Vec<u8>> = (0..slices)
        .map(|i| {
            let mut unit = vec![header];
            unit.extend((0..per_slice - 1).map(|j| ((i + j) % 251 + 1) as u8));
            unit
        })
        .collect();
    length_prefix(&units)
}

fn bench_to_wire_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_wire_format");
    let sets = parameter_sets();

    // 1.5 Mbps at 30 fps averages ~6 KB per frame; key frames run larger
    for (name, key_frame, size) in [("delta_6k", false, 6_000), ("key_40k", true, 40_000)] {
        for slices in [1, 4] {
            let frame = encoded_frame(key_frame, slices, size);
            group.throughput(Throughput::Bytes(frame.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, slices), &frame, |b, frame| {
                b.iter(|| to_wire_format(black_box(frame), key_frame, Some(&sets)))
            });
        }
    }
    group.finish();
}

fn bench_receive_side(c: &mut Criterion) {
    let mut group = c.benchmark_group("receive_side");
    let sets = parameter_sets();
    let wire = to_wire_format(&encoded_frame(true, 4, 40_000), true, Some(&sets)).unwrap_or_default();
    group.throughput(Throughput::Bytes(wire.len() as u64));

    group.bench_function("start_code_units", |b| {
        b.iter(|| start_code_units(black_box(&wire)).count())
    });

    group.bench_function("to_length_prefixed", |b| {
        b.iter(|| to_length_prefixed(black_box(&wire)))
    });

    group.finish();
}

criterion_group!(benches, bench_to_wire_format, bench_receive_side);
criterion_main!(benches);
