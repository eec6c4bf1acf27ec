//! Receive-side validation: frame sync under offsets, photon channel
//! impairments, and erasure tolerance.

use heliograph_core::channel::{photon_timestamps, PhotonChannelConfig};
use heliograph_core::config::{SessionConfig, SessionParams};
use heliograph_core::decoder::DecoderSession;
use heliograph_core::encoder::encode;
use heliograph_core::errors::{FrameSyncError, HeliographError};
use heliograph_core::logging::LogConfig;
use heliograph_core::ppm::{slot_demap, Detected};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_bits(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..=1u8)).collect()
}

fn session(params: SessionParams) -> DecoderSession {
    DecoderSession::new(params).with_log_config(LogConfig::quiet())
}

#[test]
fn frame_sync_with_symbol_offset() {
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    let payload = random_bits(params.config.code_rate.payload_bits(), 21);
    let frame = encode(&payload, &params);

    // Prepend 37 unrelated symbols ahead of the first CSM.
    let mut rng = StdRng::seed_from_u64(22);
    let mut stream: Vec<Detected> = (0..37)
        .map(|_| Detected::Pulse(rng.gen_range(0..params.ppm_order() as u16)))
        .collect();
    stream.extend(slot_demap(&frame.slot_matrix, &params));

    let mut session = session(params);
    let out = session.decode_symbols(&stream, 0).unwrap();
    assert!(out.report.csm_positions[0].abs_diff(37) <= 1);
    assert_eq!(&out.bits[..payload.len()], &payload[..]);
}

#[test]
fn sync_fails_without_markers() {
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    // Symbol 7 never appears in the 8-PPM marker, so correlation stays flat.
    let stream = vec![Detected::Pulse(7); 4000];
    let mut session = session(params);
    assert!(matches!(
        session.decode_symbols(&stream, 0),
        Err(HeliographError::FrameSync(FrameSyncError::TooFewMarkers { .. }))
    ));
}

#[test]
fn timestamps_round_trip_with_reference() {
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    let payload = random_bits(6000, 31);
    let frame = encode(&payload, &params);

    let mut rng = StdRng::seed_from_u64(32);
    let times = photon_timestamps(
        &frame.slot_matrix,
        &PhotonChannelConfig::noiseless(),
        &params,
        &mut rng,
    );

    let mut session = session(params).with_reference_symbols(frame.symbols.clone());
    let out = session.decode_timestamps(&times, Some(0.0)).unwrap();

    assert_eq!(&out.bits[..payload.len()], &payload[..]);
    assert_eq!(out.report.ber_pre, Some(0.0));
    assert_eq!(out.report.dark_counts, 0);
}

#[test]
fn dark_counts_are_tolerated() {
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    let payload = random_bits(params.config.code_rate.payload_bits(), 41);
    let frame = encode(&payload, &params);

    let channel = PhotonChannelConfig {
        signal_photons: 3.0,
        background_photons: 0.01,
        jitter_sigma: 0.02,
        clock_skew: 1.0,
        deterministic_signal: false,
    };
    let mut rng = StdRng::seed_from_u64(42);
    let times = photon_timestamps(&frame.slot_matrix, &channel, &params, &mut rng);

    let mut session = session(params);
    let out = session.decode_timestamps(&times, Some(0.0)).unwrap();

    assert!(out.report.dark_counts > 0);
    assert!(
        out.report.uncorrectable_codewords.is_empty(),
        "uncorrectable: {:?}",
        out.report.uncorrectable_codewords
    );
    assert_eq!(&out.bits[..payload.len()], &payload[..]);
}

#[test]
fn erasures_are_tolerated() {
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    let payload = random_bits(params.config.code_rate.payload_bits(), 51);
    let frame = encode(&payload, &params);

    // Erase 10% of the received rows, CSM regions included.
    let mut stream = slot_demap(&frame.slot_matrix, &params);
    let mut rng = StdRng::seed_from_u64(52);
    for d in stream.iter_mut() {
        if rng.gen::<f64>() < 0.10 {
            *d = Detected::Erasure;
        }
    }

    let mut session = session(params);
    let out = session.decode_symbols(&stream, 0).unwrap();
    assert!(
        out.report.uncorrectable_codewords.is_empty(),
        "uncorrectable: {:?}",
        out.report.uncorrectable_codewords
    );
    assert_eq!(&out.bits[..payload.len()], &payload[..]);
}

#[test]
fn turbo_iterations_grow_under_impairment() {
    // Clean decode needs one iteration; erasures should need at least as
    // many, and the mean info-LLR history is exposed per codeword.
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    let payload = random_bits(2000, 61);
    let frame = encode(&payload, &params);

    let mut stream = slot_demap(&frame.slot_matrix, &params);
    let mut rng = StdRng::seed_from_u64(62);
    for d in stream.iter_mut() {
        if rng.gen::<f64>() < 0.10 {
            *d = Detected::Erasure;
        }
    }

    let mut session = session(params);
    let out = session.decode_symbols(&stream, 0).unwrap();
    let max_iters = out.report.iterations_used.iter().copied().max().unwrap();
    assert!(max_iters >= 1);
    assert_eq!(&out.bits[..payload.len()], &payload[..]);
}
