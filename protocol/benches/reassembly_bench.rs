// Scanner hot-path benchmarks.
//
// Covers byte-mode stripping, frame decoding, multi-part reassembly at
// various frame counts, and classification of a completed payload.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parity_scale_codec::{Compact, Encode};

use airgap_protocol::network::registry::EDGEWARE_GENESIS;
use airgap_protocol::network::NetworkRegistry;
use airgap_protocol::scanner::{
    classify, decode, strip_byte_mode, Classifiable, CompletedPayload, RawScanEvent,
    Reassembler, SubstrateFrame,
};

fn substrate_payload(call_len: usize) -> Vec<u8> {
    let call = vec![0x42u8; call_len];
    let mut bytes = vec![0x53, 0x00, 0x00];
    bytes.extend_from_slice(&[0x11; 32]);
    bytes.extend_from_slice(&Compact(call_len as u32).encode());
    bytes.extend_from_slice(&call);
    bytes.extend_from_slice(&hex::decode(&EDGEWARE_GENESIS[2..]).unwrap());
    bytes
}

fn frames(payload: &[u8], count: usize) -> Vec<SubstrateFrame> {
    let chunk = payload.len().div_ceil(count);
    payload
        .chunks(chunk)
        .enumerate()
        .map(|(i, part)| SubstrateFrame {
            frame_index: i as u32,
            frame_count: count as u32,
            part_data: part.to_vec(),
        })
        .collect()
}

fn bench_strip_byte_mode(c: &mut Criterion) {
    let event = RawScanEvent::from_payload(&substrate_payload(1024)).unwrap();

    c.bench_function("scanner/strip_byte_mode", |b| {
        b.iter(|| strip_byte_mode(&event.raw_bytes).unwrap());
    });
}

fn bench_decode_frame(c: &mut Criterion) {
    let registry = NetworkRegistry::with_defaults();
    let frame = &frames(&substrate_payload(512), 4)[1];
    let event = RawScanEvent::from_payload(&frame.to_bytes()).unwrap();

    c.bench_function("scanner/decode_frame", |b| {
        b.iter(|| decode(&event, &registry).unwrap());
    });
}

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner/reassemble");
    let payload = substrate_payload(8 * 1024);

    for count in [2usize, 8, 32, 128] {
        let parts = frames(&payload, count);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &parts, |b, parts| {
            b.iter(|| {
                let mut reassembler = Reassembler::new();
                // Reverse order keeps every insert off the fast path.
                for frame in parts.iter().rev() {
                    reassembler.accept(frame.clone());
                }
            });
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let registry = NetworkRegistry::with_defaults();
    let mut group = c.benchmark_group("scanner/classify_substrate");

    for call_len in [128usize, 4096] {
        let payload = substrate_payload(call_len);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(call_len), &payload, |b, payload| {
            b.iter(|| {
                let input = Classifiable::Completed(CompletedPayload::new(payload.clone()));
                classify(input, &registry).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_strip_byte_mode,
    bench_decode_frame,
    bench_reassembly,
    bench_classify,
);
criterion_main!(benches);
