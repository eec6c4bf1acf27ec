//! Noise-free codec validation: round trips across orders, rates, and
//! pipeline options.

use heliograph_core::config::{CodeRate, SessionConfig, SessionParams};
use heliograph_core::decoder::DecoderSession;
use heliograph_core::encoder::{calibration_pattern, encode};
use heliograph_core::logging::LogConfig;
use heliograph_core::ppm::{csm_for_order, slot_demap, Detected};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_bits(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..=1u8)).collect()
}

fn roundtrip(config: SessionConfig, payload: &[u8]) -> heliograph_core::DecodeOutput {
    let params = SessionParams::new(config).unwrap();
    let frame = encode(payload, &params);
    let mut session = DecoderSession::new(params).with_log_config(LogConfig::quiet());
    session.decode_slot_matrix(&frame.slot_matrix).unwrap()
}

#[test]
fn single_codeword_noise_free() {
    let config = SessionConfig::default(); // 8-PPM, rate 2/3, B=2520, N=2
    let payload = random_bits(config.code_rate.payload_bits(), 2);
    let out = roundtrip(config, &payload);

    assert_eq!(out.bits, payload);
    assert_eq!(out.report.payload_codewords, 1);
    // A clean channel decodes on the first turbo iteration.
    assert_eq!(out.report.iterations_used, vec![1]);
    assert!(out.report.uncorrectable_codewords.is_empty());
}

#[test]
fn multi_codeword_payload_reassembles_in_order() {
    let config = SessionConfig::default();
    let capacity = config.code_rate.payload_bits();
    let payload = random_bits(capacity * 3 + 1234, 3);
    let out = roundtrip(config, &payload);

    assert_eq!(out.report.payload_codewords, 4);
    assert_eq!(&out.bits[..payload.len()], &payload[..]);
    // Padding decodes as zeros.
    assert!(out.bits[payload.len()..].iter().all(|&b| b == 0));
}

#[test]
fn all_code_rates_round_trip() {
    for rate in [CodeRate::OneThird, CodeRate::OneHalf, CodeRate::TwoThirds] {
        let config = SessionConfig {
            code_rate: rate,
            ..SessionConfig::default()
        };
        let payload = random_bits(4000, 5);
        let out = roundtrip(config, &payload);
        assert_eq!(&out.bits[..payload.len()], &payload[..], "rate {rate}");
        assert!(out.report.uncorrectable_codewords.is_empty(), "rate {rate}");
    }
}

#[test]
fn other_ppm_orders_round_trip() {
    for (order, b, n) in [(4usize, 3780usize, 2usize), (16, 1890, 2), (64, 2520, 2)] {
        let config = SessionConfig {
            ppm_order: order,
            b_interleaver: b,
            n_interleaver: n,
            ..SessionConfig::default()
        };
        let payload = random_bits(2500, order as u64);
        let out = roundtrip(config, &payload);
        assert_eq!(&out.bits[..payload.len()], &payload[..], "M = {order}");
    }
}

#[test]
fn randomizer_and_inner_encoder_are_optional() {
    for (use_randomizer, use_inner_encoder) in [(false, true), (true, false), (false, false)] {
        let config = SessionConfig {
            use_randomizer,
            use_inner_encoder,
            ..SessionConfig::default()
        };
        let payload = random_bits(3000, 7);
        let out = roundtrip(config, &payload);
        assert_eq!(
            &out.bits[..payload.len()],
            &payload[..],
            "randomizer={use_randomizer} inner={use_inner_encoder}"
        );
        if !use_inner_encoder {
            // Nothing to iterate against without the inner code.
            assert!(out.report.iterations_used.iter().all(|&i| i == 1));
        }
    }
}

#[test]
fn calibration_pattern_marks_column_one() {
    // 1890 copies of symbol 1 and a zero terminator, mapped without coding.
    let params = SessionParams::new(SessionConfig {
        use_randomizer: false,
        ..SessionConfig::default()
    })
    .unwrap();
    let frame = calibration_pattern(1, 1890, false, &params);

    for (i, row) in frame.slot_matrix.rows().into_iter().enumerate() {
        let expected_column = if i < 1890 { 1 } else { 0 };
        assert_eq!(row[expected_column], 1, "row {i}");
        assert_eq!(row.iter().map(|&v| v as usize).sum::<usize>(), 1);
    }

    // Demapping the slot matrix recovers the pattern exactly.
    let detected = slot_demap(&frame.slot_matrix, &params);
    for (i, d) in detected.iter().enumerate() {
        let expected = if i < 1890 { 1 } else { 0 };
        assert_eq!(*d, Detected::Pulse(expected));
    }
}

#[test]
fn framed_calibration_pattern_carries_csms() {
    let params = SessionParams::new(SessionConfig::default()).unwrap();
    let frame = calibration_pattern(1, 1890, true, &params);
    let csm = csm_for_order(params.ppm_order());
    assert_eq!(&frame.symbols[..csm.len()], csm);
    assert_eq!(
        frame.symbols.len() % (params.symbols_per_codeword + csm.len()),
        0
    );
}

#[test]
fn puncturing_shortens_output_and_stays_lossless() {
    // The same payload at rates 1/3 and 1/2: the punctured stream carries
    // fewer codewords for the same information, and both decode exactly.
    let payload = random_bits(CodeRate::OneThird.payload_bits() * 2, 11);

    let third = SessionConfig {
        code_rate: CodeRate::OneThird,
        ..SessionConfig::default()
    };
    let half = SessionConfig {
        code_rate: CodeRate::OneHalf,
        ..SessionConfig::default()
    };

    let params_third = SessionParams::new(third.clone()).unwrap();
    let params_half = SessionParams::new(half.clone()).unwrap();
    let frame_third = encode(&payload, &params_third);
    let frame_half = encode(&payload, &params_half);

    // Two blocks at rate 1/3, and the same bits fit in two at rate 1/2.
    assert_eq!(frame_third.payload_codewords, 2);
    assert_eq!(frame_half.payload_codewords, 2);
    // Every codeword is 15120 coded bits regardless of rate: the mother
    // stream was 3k bits, punctured by 2/3 for rate 1/2.
    assert_eq!(
        frame_third.slot_matrix.nrows(),
        frame_half.slot_matrix.nrows()
    );

    let out_third = roundtrip(third, &payload);
    let out_half = roundtrip(half, &payload);
    assert_eq!(&out_third.bits[..payload.len()], &payload[..]);
    assert_eq!(&out_half.bits[..payload.len()], &payload[..]);
}
