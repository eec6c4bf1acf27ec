use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use heliograph_core::config::{CodeRate, SessionConfig, SessionParams};
use heliograph_core::encoder::encode;
use heliograph_core::interleaver::bit_interleave;
use heliograph_core::randomizer::randomize_bits;
use heliograph_core::trellis::{convolutional_encode, puncture, OuterTrellis};

fn benchmark_full_encode(c: &mut Criterion) {
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    let payload: Vec<u8> = (0..params.config.code_rate.payload_bits())
        .map(|i| ((i * 31 + 5) % 2) as u8)
        .collect();

    c.bench_function("encode_single_codeword", |b| {
        b.iter(|| encode(black_box(&payload), black_box(&params)))
    });

    let long_payload: Vec<u8> = payload.iter().cycle().take(payload.len() * 8).copied().collect();
    c.bench_function("encode_eight_codewords", |b| {
        b.iter(|| encode(black_box(&long_payload), black_box(&params)))
    });
}

fn benchmark_encode_stages(c: &mut Criterion) {
    let trellis = OuterTrellis::new();
    let info = vec![1u8; CodeRate::TwoThirds.information_block_bits()];

    c.bench_function("outer_convolutional_encode", |b| {
        b.iter(|| convolutional_encode(black_box(&trellis), black_box(&info)))
    });

    let mother = convolutional_encode(&trellis, &info);
    c.bench_function("puncture_rate_two_thirds", |b| {
        b.iter(|| puncture(black_box(&mother), CodeRate::TwoThirds))
    });

    let coded = puncture(&mother, CodeRate::TwoThirds);
    c.bench_function("randomize_codeword", |b| {
        b.iter(|| {
            let mut bits = coded.clone();
            randomize_bits(&mut bits);
            bits
        })
    });

    c.bench_function("bit_interleave_codeword", |b| {
        b.iter(|| bit_interleave(black_box(&coded), 3))
    });
}

fn benchmark_encode_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_by_ppm_order");
    for (order, b_interleaver) in [(4usize, 3780usize), (8, 2520), (16, 1890), (64, 2520)] {
        let params = SessionParams::new(SessionConfig {
            ppm_order: order,
            b_interleaver,
            ..SessionConfig::default()
        })
        .unwrap();
        let payload: Vec<u8> = (0..4096).map(|i| (i % 2) as u8).collect();
        group.bench_with_input(BenchmarkId::from_parameter(order), &params, |b, params| {
            b.iter(|| encode(black_box(&payload), params))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_full_encode,
    benchmark_encode_stages,
    benchmark_encode_orders
);
criterion_main!(benches);
