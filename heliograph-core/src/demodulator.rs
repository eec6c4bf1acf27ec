//! Timestamp demodulator: photon arrival times to slot-quantized symbols.

use crate::config::SessionParams;
use crate::errors::DemodulatorError;
use crate::ppm::Detected;

/// Demodulated symbol stream plus channel statistics.
#[derive(Debug, Clone)]
pub struct DemodOutput {
    pub symbols: Vec<Detected>,
    /// Events that could not be attributed to a signal slot
    pub dark_counts: usize,
    pub num_frames: usize,
}

/// Bin a sorted photon arrival stream into symbol frames.
///
/// Policy per frame: the first event whose slot falls in the signal region
/// `[0, M)` wins; guard-slot events and surplus events count as dark
/// counts; a frame with no usable event emits an erasure. When the timing
/// gate is enabled, pulses further than 3 sigma from their slot center
/// (sigma = 0.1 slot) are treated as dark counts too.
///
/// `start_time` anchors the slot grid. When absent, the grid is anchored on
/// the first event under the assumption that it is the opening CSM pulse.
pub fn demodulate(
    timestamps: &[f64],
    start_time: Option<f64>,
    params: &SessionParams,
) -> Result<DemodOutput, DemodulatorError> {
    let first = *timestamps.first().ok_or(DemodulatorError::EmptyStream)?;
    for (i, pair) in timestamps.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(DemodulatorError::NonMonotonic {
                index: i + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }

    let slot_length = params.config.slot_length;
    let symbol_length = params.symbol_length;
    let t0 = start_time.unwrap_or(first - 0.5 * slot_length);
    let last = *timestamps.last().expect("stream is non-empty");
    let num_frames = ((last - t0) / symbol_length).floor() as usize + 1;

    let mut symbols = Vec::with_capacity(num_frames);
    let mut dark_counts = 0usize;
    let mut cursor = 0usize;

    for frame in 0..num_frames {
        let frame_start = t0 + frame as f64 * symbol_length;
        let frame_end = frame_start + symbol_length;

        // Advance to the first event of this frame.
        while cursor < timestamps.len() && timestamps[cursor] < frame_start {
            cursor += 1;
        }
        let begin = cursor;
        while cursor < timestamps.len() && timestamps[cursor] < frame_end {
            cursor += 1;
        }
        let events = &timestamps[begin..cursor];

        if events.is_empty() {
            symbols.push(Detected::Erasure);
            continue;
        }

        let mut chosen = None;
        for &t in events {
            let slot = ((t - frame_start - 0.5 * slot_length) / slot_length).round();
            if slot < 0.0 || slot as usize >= params.ppm_order() {
                // Guard-slot or out-of-range event.
                continue;
            }
            if params.config.timing_gate && !within_timing_gate(t, frame_start, slot_length) {
                continue;
            }
            chosen = Some(slot as u16);
            break;
        }

        // Every event not attributed to the symbol is a dark count: guard
        // slot and gate-rejected pulses as well as surplus events behind
        // the accepted one.
        dark_counts += events.len() - chosen.is_some() as usize;

        match chosen {
            Some(slot) => symbols.push(Detected::Pulse(slot)),
            None => {
                // Pulses were seen but none was a valid symbol.
                symbols.push(Detected::Erasure);
            }
        }
    }

    Ok(DemodOutput {
        symbols,
        dark_counts,
        num_frames,
    })
}

/// Timing-quality gate: accept a pulse only within 3 sigma of its slot
/// center, sigma = 0.1 slot.
fn within_timing_gate(pulse: f64, frame_start: f64, slot_length: f64) -> bool {
    let offset = pulse - frame_start;
    let slot = (offset / slot_length).floor();
    let center = (slot + 0.5) * slot_length;
    let sigma = 0.1 * slot_length;
    (offset - center).abs() <= 3.0 * sigma
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SessionConfig, SessionParams};

    fn params() -> SessionParams {
        SessionParams::new(SessionConfig {
            slot_length: 1.0,
            ..SessionConfig::default()
        })
        .unwrap()
    }

    /// Place a pulse at the center of `slot` within symbol frame `frame`.
    fn pulse(frame: usize, slot: usize, params: &SessionParams) -> f64 {
        frame as f64 * params.symbol_length + (slot as f64 + 0.5) * params.config.slot_length
    }

    #[test]
    fn clean_symbols_demodulate() {
        let p = params();
        let times: Vec<f64> = [3usize, 0, 7, 5]
            .iter()
            .enumerate()
            .map(|(frame, &slot)| pulse(frame, slot, &p))
            .collect();
        let out = demodulate(&times, Some(0.0), &p).unwrap();
        assert_eq!(
            out.symbols,
            vec![
                Detected::Pulse(3),
                Detected::Pulse(0),
                Detected::Pulse(7),
                Detected::Pulse(5)
            ]
        );
        assert_eq!(out.dark_counts, 0);
    }

    #[test]
    fn empty_frame_is_erasure() {
        let p = params();
        let times = vec![pulse(0, 2, &p), pulse(2, 4, &p)];
        let out = demodulate(&times, Some(0.0), &p).unwrap();
        assert_eq!(out.symbols[1], Detected::Erasure);
    }

    #[test]
    fn guard_slot_event_is_dark_count() {
        let p = params();
        // Frame 0 holds only a guard-slot event (slot 8 is the first guard
        // slot for M = 8): no valid symbol, one dark count. Frame 1 has a
        // signal pulse followed by a guard-slot straggler.
        let times = vec![pulse(0, 8, &p), pulse(1, 1, &p), pulse(1, 9, &p)];
        let out = demodulate(&times, Some(0.0), &p).unwrap();
        assert_eq!(out.symbols[0], Detected::Erasure);
        assert_eq!(out.symbols[1], Detected::Pulse(1));
        assert_eq!(out.dark_counts, 2);
    }

    #[test]
    fn first_valid_event_wins() {
        let p = params();
        let times = vec![pulse(0, 2, &p), pulse(0, 6, &p), pulse(1, 0, &p)];
        let out = demodulate(&times, Some(0.0), &p).unwrap();
        assert_eq!(out.symbols[0], Detected::Pulse(2));
        assert_eq!(out.dark_counts, 1);
    }

    #[test]
    fn timing_gate_rejects_off_center_pulse() {
        let config = SessionConfig {
            slot_length: 1.0,
            timing_gate: true,
            ..SessionConfig::default()
        };
        let p = SessionParams::new(config).unwrap();
        // 0.4 slots off center is outside the 3-sigma (0.3 slot) gate.
        let times = vec![
            0.5 + 2.0 + 0.4, // frame 0, slot 2, late
            p.symbol_length + 0.5 + 3.0, // frame 1, slot 3, centered
        ];
        let out = demodulate(&times, Some(0.0), &p).unwrap();
        assert_eq!(out.symbols[0], Detected::Erasure);
        assert_eq!(out.symbols[1], Detected::Pulse(3));
        // The rejected pulse is accounted as a dark count.
        assert_eq!(out.dark_counts, 1);
    }

    #[test]
    fn rejects_non_monotonic_stream() {
        let p = params();
        let times = vec![1.0, 0.5];
        assert!(matches!(
            demodulate(&times, Some(0.0), &p),
            Err(DemodulatorError::NonMonotonic { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_empty_stream() {
        let p = params();
        assert!(matches!(
            demodulate(&[], Some(0.0), &p),
            Err(DemodulatorError::EmptyStream)
        ));
    }
}
