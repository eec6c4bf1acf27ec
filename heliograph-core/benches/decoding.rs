use criterion::{black_box, criterion_group, criterion_main, Criterion};
use heliograph_core::bcjr::{appm_siso, outer_bcjr, BcjrScratch, InnerTrellis, MaxStar};
use heliograph_core::config::{SessionConfig, SessionParams};
use heliograph_core::decoder::DecoderSession;
use heliograph_core::encoder::encode;
use heliograph_core::logging::LogConfig;
use heliograph_core::trellis::{convolutional_encode, OuterTrellis};
use ndarray::Array2;

fn benchmark_session_decode(c: &mut Criterion) {
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    let payload: Vec<u8> = (0..params.config.code_rate.payload_bits())
        .map(|i| ((i * 17 + 3) % 2) as u8)
        .collect();
    let frame = encode(&payload, &params);

    let mut group = c.benchmark_group("session_decode");
    group.sample_size(10);
    group.bench_function("clean_single_codeword", |b| {
        b.iter(|| {
            let mut session = DecoderSession::new(params.clone())
                .with_log_config(LogConfig::quiet());
            session.decode_slot_matrix(black_box(&frame.slot_matrix)).unwrap()
        })
    });
    group.finish();
}

fn benchmark_bcjr_passes(c: &mut Criterion) {
    let trellis = OuterTrellis::new();
    let max_star = MaxStar::new();
    let mut scratch = BcjrScratch::new();

    let info: Vec<u8> = (0..10080).map(|i| ((i * 7 + 1) % 2) as u8).collect();
    let mut info = info;
    for b in info.iter_mut().rev().take(6) {
        *b = 0;
    }
    let mother = convolutional_encode(&trellis, &info);
    let llrs: Vec<f64> = mother
        .iter()
        .map(|&b| if b == 1 { 4.0 } else { -4.0 })
        .collect();

    let mut group = c.benchmark_group("bcjr");
    group.sample_size(10);
    group.bench_function("outer_64_state_pass", |b| {
        b.iter(|| outer_bcjr(black_box(&trellis), black_box(&llrs), &max_star, &mut scratch))
    });

    let inner = InnerTrellis::new(8);
    let stages = 5040;
    let mut channel = Array2::<f64>::zeros((stages, 8));
    for i in 0..stages {
        channel[(i, i % 8)] = 6.0;
    }
    let priors = vec![0.0f64; stages * 3];
    group.bench_function("inner_appm_pass", |b| {
        b.iter(|| {
            appm_siso(
                black_box(&inner),
                channel.view(),
                black_box(&priors),
                &max_star,
                &mut scratch,
            )
        })
    });
    group.finish();
}

criterion_group!(benches, benchmark_session_decode, benchmark_bcjr_passes);
criterion_main!(benches);
