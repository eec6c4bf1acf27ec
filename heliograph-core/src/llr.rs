//! Per-symbol log-likelihoods for the Poisson photon-counting channel.

use ndarray::Array2;

use crate::config::SessionParams;
use crate::ppm::{csm_for_order, Detected};

/// Signal and background Poisson rates, per signal slot and per slot.
#[derive(Debug, Clone, Copy)]
pub struct ChannelRates {
    pub signal: f64,
    pub background: f64,
}

impl Default for ChannelRates {
    fn default() -> Self {
        // Lab-typical operating point when no CSM estimate is available.
        Self {
            signal: 3.0,
            background: 0.01,
        }
    }
}

impl ChannelRates {
    /// Log-likelihood weight carried by a detected pulse.
    pub fn pulse_weight(&self) -> f64 {
        ((self.signal + self.background) / self.background).ln()
    }
}

/// Estimate channel rates from the synchronized CSM regions.
///
/// The detection probability of a signal slot under Poisson counting is
/// `1 - exp(-n_s)`, so the match rate over known CSM symbols gives the ML
/// signal rate. The background rate comes from the dark-count total over
/// all observed slots. Both are clamped away from degenerate values.
pub fn estimate_rates(
    stream: &[Detected],
    csm_positions: &[usize],
    dark_counts: usize,
    params: &SessionParams,
) -> ChannelRates {
    let csm = csm_for_order(params.ppm_order());
    let mut matches = 0usize;
    let mut total = 0usize;
    for &pos in csm_positions {
        for (i, &expected) in csm.iter().enumerate() {
            match stream.get(pos + i) {
                Some(Detected::Pulse(slot)) => {
                    total += 1;
                    if *slot == expected {
                        matches += 1;
                    }
                }
                Some(Detected::Erasure) => total += 1,
                None => {}
            }
        }
    }

    let detection_rate = if total == 0 {
        0.0
    } else {
        matches as f64 / total as f64
    };
    let signal = (-(1.0 - detection_rate).max(1e-9).ln()).clamp(0.05, 20.0);

    let observed_slots = stream.len() * params.slots_per_symbol;
    let background = if observed_slots == 0 {
        ChannelRates::default().background
    } else {
        (dark_counts as f64 / observed_slots as f64).clamp(1e-6, 1.0)
    };

    ChannelRates { signal, background }
}

/// Build the LLR table for one codeword: one row per symbol, one column per
/// PPM value, natural-log units.
///
/// With a single pulse in slot `s*` the Poisson likelihood ratio reduces to
/// a constant bonus `ln(1 + n_s/n_b)` on `v == s*`; terms common to all v
/// cancel. Erasure frames carry no information and stay uniform at zero.
pub fn build_llrs(
    symbols: &[Detected],
    rates: ChannelRates,
    params: &SessionParams,
) -> Array2<f64> {
    let m = params.ppm_order();
    let weight = rates.pulse_weight();
    let mut llrs = Array2::<f64>::zeros((symbols.len(), m));
    for (row, detected) in symbols.iter().enumerate() {
        if let Detected::Pulse(slot) = detected {
            let slot = *slot as usize;
            if slot < m {
                llrs[(row, slot)] = weight;
            }
        }
    }
    llrs
}
