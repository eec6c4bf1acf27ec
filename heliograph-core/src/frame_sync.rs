//! Codeword frame synchronization on the demodulated symbol stream.
//!
//! CSM discovery runs on detected slot values, not timestamps: a sliding
//! coincidence correlation against the known marker, an acceptance
//! threshold of K times the median correlation, and spacing-constrained
//! refinement for the markers that follow. Clock skew between transmitter
//! and receiver shows up as stretched inter-CSM spacing; each codeword is
//! resampled onto the nominal symbol grid before decoding.

use crate::config::SessionParams;
use crate::errors::FrameSyncError;
use crate::logging::LinkLogger;
use crate::ppm::{csm_for_order, Detected};

/// Search half-width around the predicted CSM location, in symbols.
const SPACING_TOLERANCE: usize = 8;

/// Synchronized codeword boundaries.
#[derive(Debug, Clone)]
pub struct FrameSync {
    /// Symbol index of each confirmed CSM
    pub csm_positions: Vec<usize>,
    /// Codeword payloads resampled to `symbols_per_codeword`, CSMs stripped
    pub codewords: Vec<Vec<Detected>>,
}

/// Coincidence correlation of the stream against the marker at one offset.
fn correlation_at(stream: &[Detected], csm: &[u16], offset: usize) -> usize {
    csm.iter()
        .enumerate()
        .filter(|(i, &expected)| stream[offset + i] == Detected::Pulse(expected))
        .count()
}

/// Locate every CSM and carve the stream into drift-compensated codewords.
pub fn synchronize(
    stream: &[Detected],
    params: &SessionParams,
    logger: &mut LinkLogger,
) -> Result<FrameSync, FrameSyncError> {
    let csm = csm_for_order(params.ppm_order());
    if stream.len() < csm.len() {
        return Err(FrameSyncError::StreamTooShort {
            symbols: stream.len(),
            csm_len: csm.len(),
        });
    }

    let span = stream.len() - csm.len() + 1;
    let correlation: Vec<usize> = (0..span)
        .map(|offset| correlation_at(stream, csm, offset))
        .collect();

    let mut sorted = correlation.clone();
    sorted.sort_unstable();
    let median = sorted[sorted.len() / 2] as f64;
    let threshold = (params.config.csm_threshold_k * median).max(csm.len() as f64 * 0.5);
    logger.debug(
        "SYNC",
        format!("correlation median {median:.1}, threshold {threshold:.1}"),
    );

    // Anchor on the strongest peak in the stream; every true marker shares
    // the same height in clean conditions, so any of them anchors equally.
    let anchor = (0..span)
        .max_by_key(|&i| correlation[i])
        .expect("span is non-empty");
    if (correlation[anchor] as f64) < threshold {
        return Err(FrameSyncError::TooFewMarkers { found: 0 });
    }

    // Walk outward in both directions, constraining each next marker to a
    // window around the codeword-stride prediction.
    let stride = params.symbols_per_codeword + csm.len();
    let window = |predicted: usize| -> Option<usize> {
        let lo = predicted.saturating_sub(SPACING_TOLERANCE);
        let hi = (predicted + SPACING_TOLERANCE + 1).min(span);
        if lo >= hi {
            return None;
        }
        let best = (lo..hi).max_by_key(|&i| correlation[i]).unwrap();
        ((correlation[best] as f64) >= threshold).then_some(best)
    };

    let mut positions = vec![anchor];
    while let Some(next) = positions
        .last()
        .and_then(|&p| p.checked_add(stride))
        .filter(|&p| p < span + SPACING_TOLERANCE)
        .and_then(window)
    {
        positions.push(next);
    }
    while let Some(previous) = positions
        .first()
        .and_then(|&p| p.checked_sub(stride))
        .and_then(window)
    {
        positions.insert(0, previous);
    }

    if positions.len() < 2 {
        return Err(FrameSyncError::TooFewMarkers {
            found: positions.len(),
        });
    }
    logger.info(
        "SYNC",
        format!(
            "{} CSM(s), first at symbol {}",
            positions.len(),
            positions[0]
        ),
    );

    let codewords = extract_codewords(stream, &positions, params, logger)?;
    Ok(FrameSync {
        csm_positions: positions,
        codewords,
    })
}

/// Carve codewords between confirmed markers, linearly resampling the
/// symbol index axis so accumulated clock drift is absorbed.
fn extract_codewords(
    stream: &[Detected],
    positions: &[usize],
    params: &SessionParams,
    logger: &mut LinkLogger,
) -> Result<Vec<Vec<Detected>>, FrameSyncError> {
    let csm_len = csm_for_order(params.ppm_order()).len();
    let spc = params.symbols_per_codeword;
    let mut codewords = Vec::with_capacity(positions.len());

    for pair in positions.windows(2) {
        let begin = pair[0] + csm_len;
        if pair[1] < begin {
            return Err(FrameSyncError::ImplausibleSpacing {
                actual: pair[1] - pair[0],
                expected: spc + csm_len,
                tolerance: SPACING_TOLERANCE,
            });
        }
        let actual = pair[1] - begin;
        if actual.abs_diff(spc) > SPACING_TOLERANCE {
            return Err(FrameSyncError::ImplausibleSpacing {
                actual: pair[1] - pair[0],
                expected: spc + csm_len,
                tolerance: SPACING_TOLERANCE,
            });
        }
        if actual != spc {
            logger.debug(
                "DRIFT",
                format!(
                    "codeword at {begin}: {actual} symbols observed, resampling to {spc}"
                ),
            );
        }
        let mut codeword = Vec::with_capacity(spc);
        for i in 0..spc {
            let src = begin + resample_index(i, actual, spc);
            codeword.push(stream.get(src).copied().unwrap_or(Detected::Erasure));
        }
        codewords.push(codeword);
    }

    // The stretch after the final marker has no closing CSM; read it at the
    // nominal rate and pad the shortfall with erasures.
    let begin = positions.last().unwrap() + csm_len;
    let mut tail = Vec::with_capacity(spc);
    for i in 0..spc {
        tail.push(stream.get(begin + i).copied().unwrap_or(Detected::Erasure));
    }
    codewords.push(tail);

    Ok(codewords)
}

/// Nearest-neighbor map of nominal index `i` onto a segment that actually
/// spans `actual` symbols instead of `nominal`.
#[inline]
fn resample_index(i: usize, actual: usize, nominal: usize) -> usize {
    ((i as f64 * actual as f64 / nominal as f64) + 0.5).floor() as usize
}
