use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use plcstream::types::{decode_registers, PointTemplate, Sample};

/// Raw big-endian payload for a full 125-register read
fn full_window_payload() -> Vec<u8> {
    (0..125i16)
        .flat_map(|v| v.wrapping_mul(257).to_be_bytes())
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let raw = full_window_payload();

    let mut group = c.benchmark_group("decode");
    group.bench_function("decode_registers_125", |b| {
        b.iter(|| decode_registers(black_box(&raw)))
    });
    group.finish();
}

fn bench_point_materialization(c: &mut Criterion) {
    let raw = full_window_payload();
    let template = PointTemplate::new(
        "experiment",
        vec![("location".to_string(), "tianjin".to_string())],
        125,
    );
    let sample = Sample::from_raw(Utc::now(), &raw);

    let mut group = c.benchmark_group("materialize");
    group.bench_function("template_point_125", |b| {
        b.iter(|| template.point(black_box(&sample), black_box(42)))
    });
    group.finish();
}

criterion_group!(benches, bench_decode, bench_point_materialization);
criterion_main!(benches);
