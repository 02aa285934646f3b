//! Benchmarks for the RFID decode path.
//!
//! Run with:
//! ```sh
//! cargo bench --bench keycode_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use washbay_protocol::keycode::{KeyReportAssembler, keystroke_reports};
use washbay_protocol::{decode_keycodes, normalize_identifier};

/// Keycodes for a 36-char UUID-shaped identifier.
fn uuid_keycodes() -> Vec<u8> {
    // 8-4-4-4-12 groups of "a1b2..." style characters
    let groups = [8, 4, 4, 4, 12];
    let mut codes = Vec::new();
    for (i, len) in groups.iter().enumerate() {
        if i > 0 {
            codes.push(45);
        }
        for j in 0..*len {
            codes.push(if j % 2 == 0 { 4 + (j % 6) as u8 } else { 30 + (j % 9) as u8 });
        }
    }
    codes
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_keycodes");

    for copies in [1usize, 2] {
        let codes = uuid_keycodes().repeat(copies);
        group.throughput(Throughput::Bytes(codes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(copies), &codes, |b, codes| {
            b.iter(|| {
                let decoded = decode_keycodes(black_box(codes));
                black_box(normalize_identifier(&decoded).len());
            });
        });
    }

    group.finish();
}

fn bench_report_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_stream");
    group.throughput(Throughput::Elements(1));

    let reports: Vec<[u8; 8]> = uuid_keycodes()
        .into_iter()
        .chain([40])
        .flat_map(keystroke_reports)
        .collect();

    group.bench_function("assemble_uuid_record", |b| {
        b.iter(|| {
            let mut assembler = KeyReportAssembler::new();
            let mut record = None;
            for report in &reports {
                if let Some(done) = assembler.push_report(black_box(report)) {
                    record = Some(done);
                }
            }
            black_box(record);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_report_stream);
criterion_main!(benches);
