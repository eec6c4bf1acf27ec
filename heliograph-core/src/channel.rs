//! Photon-counting channel simulation
//!
//! Turns a slot-mapped transmit matrix into the event stream a
//! photon-counting detector would report: Poisson signal and background
//! counts, Gaussian arrival jitter inside the slot, and a linear clock-skew
//! term between the transmit and receive clocks.

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};

use crate::config::SessionParams;

/// Channel impairment settings.
#[derive(Debug, Clone, Copy)]
pub struct PhotonChannelConfig {
    /// Mean detected photons per occupied signal slot
    pub signal_photons: f64,
    /// Mean background (dark) photons per slot
    pub background_photons: f64,
    /// Arrival jitter standard deviation, as a fraction of the slot length
    pub jitter_sigma: f64,
    /// Receive-clock rate relative to the transmit clock (1.0 = locked)
    pub clock_skew: f64,
    /// Emit exactly one photon per occupied slot instead of sampling
    pub deterministic_signal: bool,
}

impl PhotonChannelConfig {
    /// Ideal detector: one centered photon per pulse, nothing else.
    pub fn noiseless() -> Self {
        Self {
            signal_photons: 1.0,
            background_photons: 0.0,
            jitter_sigma: 0.0,
            clock_skew: 1.0,
            deterministic_signal: true,
        }
    }

    /// Lab-typical operating point.
    pub fn lab_default() -> Self {
        Self {
            signal_photons: 3.0,
            background_photons: 0.01,
            jitter_sigma: 0.02,
            clock_skew: 1.0,
            deterministic_signal: false,
        }
    }
}

/// Simulate detection of a slot-mapped frame.
///
/// Returns photon arrival times in seconds, sorted ascending, on the
/// receiver's (possibly skewed) clock.
pub fn photon_timestamps<R: Rng>(
    slot_matrix: &Array2<u8>,
    config: &PhotonChannelConfig,
    params: &SessionParams,
    rng: &mut R,
) -> Vec<f64> {
    let slot_length = params.config.slot_length;
    let signal = (config.signal_photons > 0.0).then(|| {
        Poisson::new(config.signal_photons).expect("positive signal rate")
    });
    let background = (config.background_photons > 0.0).then(|| {
        Poisson::new(config.background_photons).expect("positive background rate")
    });
    let jitter = (config.jitter_sigma > 0.0).then(|| {
        Normal::new(0.0, config.jitter_sigma * slot_length).expect("finite jitter sigma")
    });

    let mut times = Vec::new();
    let slots_per_symbol = params.slots_per_symbol;
    for (row, slots) in slot_matrix.rows().into_iter().enumerate() {
        let symbol_start = (row * slots_per_symbol) as f64 * slot_length;
        for (col, &occupied) in slots.iter().enumerate() {
            let slot_start = symbol_start + col as f64 * slot_length;

            if occupied != 0 {
                let count = if config.deterministic_signal {
                    1
                } else {
                    signal.map(|d| d.sample(rng) as u64).unwrap_or(0)
                };
                for _ in 0..count {
                    let mut t = slot_start + 0.5 * slot_length;
                    if let Some(j) = jitter {
                        t += j.sample(rng);
                    }
                    times.push(t);
                }
            }

            if let Some(dist) = background {
                let count = dist.sample(rng) as u64;
                for _ in 0..count {
                    times.push(slot_start + rng.gen::<f64>() * slot_length);
                }
            }
        }
    }

    for t in times.iter_mut() {
        *t *= config.clock_skew;
    }
    times.sort_by(|a, b| a.partial_cmp(b).expect("finite timestamps"));
    times
}
