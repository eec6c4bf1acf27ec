//! Log-domain BCJR soft-input/soft-output decoding for both trellises.
//!
//! All messages are natural-log likelihood ratios in f64. The `max*`
//! operation uses a clipped correction table so the forward/backward
//! recursions stay free of transcendentals; alpha and beta are normalized
//! per stage by their maximum to bound magnitudes.

use ndarray::ArrayView2;

use crate::trellis::{OuterTrellis, MOTHER_OUTPUTS, NUM_STATES};

const TABLE_STEP: f64 = 0.125;
const TABLE_SIZE: usize = 160; // covers |delta| in [0, 20)

/// Jacobi-logarithm correction table: `max*(a,b) = max(a,b) + ln(1+e^-|a-b|)`.
#[derive(Debug, Clone)]
pub struct MaxStar {
    table: Vec<f64>,
}

impl MaxStar {
    pub fn new() -> Self {
        let table = (0..TABLE_SIZE)
            .map(|i| (1.0 + (-(i as f64) * TABLE_STEP).exp()).ln())
            .collect();
        Self { table }
    }

    #[inline]
    pub fn combine(&self, a: f64, b: f64) -> f64 {
        if a == f64::NEG_INFINITY {
            return b;
        }
        if b == f64::NEG_INFINITY {
            return a;
        }
        let delta = (a - b).abs();
        let idx = (delta / TABLE_STEP) as usize;
        let correction = if idx < TABLE_SIZE { self.table[idx] } else { 0.0 };
        a.max(b) + correction
    }
}

impl Default for MaxStar {
    fn default() -> Self {
        Self::new()
    }
}

/// Reusable alpha/beta arrays, allocated once per worker and grown on
/// demand so codeword decodes do not allocate on the hot path.
#[derive(Debug, Default)]
pub struct BcjrScratch {
    alpha: Vec<f64>,
    beta: Vec<f64>,
}

impl BcjrScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, len: usize) -> (&mut [f64], &mut [f64]) {
        self.alpha.clear();
        self.alpha.resize(len, f64::NEG_INFINITY);
        self.beta.clear();
        self.beta.resize(len, f64::NEG_INFINITY);
        (&mut self.alpha, &mut self.beta)
    }
}

/// Soft outputs of one outer-code BCJR pass.
#[derive(Debug, Clone)]
pub struct OuterDecode {
    /// A-posteriori LLRs of the information bits
    pub info_llrs: Vec<f64>,
    /// Extrinsic LLRs of the mother-code output bits
    pub coded_extrinsic: Vec<f64>,
}

/// BCJR over the 64-state outer trellis.
///
/// `coded_llrs` is the depunctured mother-length stream (zeros at punctured
/// positions); its length fixes the stage count. The trellis starts and
/// ends in state zero (termination tail included in the stages).
pub fn outer_bcjr(
    trellis: &OuterTrellis,
    coded_llrs: &[f64],
    max_star: &MaxStar,
    scratch: &mut BcjrScratch,
) -> OuterDecode {
    debug_assert_eq!(coded_llrs.len() % MOTHER_OUTPUTS, 0);
    let stages = coded_llrs.len() / MOTHER_OUTPUTS;
    let (alpha, beta) = scratch.reset((stages + 1) * NUM_STATES);

    let gamma = |stage: usize, output: u8| -> f64 {
        let mut g = 0.0;
        for j in 0..MOTHER_OUTPUTS {
            if (output >> j) & 1 == 1 {
                g += coded_llrs[stage * MOTHER_OUTPUTS + j];
            }
        }
        g
    };

    // Forward recursion from the zero state.
    alpha[0] = 0.0;
    for i in 0..stages {
        let (head, tail) = alpha.split_at_mut((i + 1) * NUM_STATES);
        let cur = &head[i * NUM_STATES..];
        let next = &mut tail[..NUM_STATES];
        for s in 0..NUM_STATES {
            let a = cur[s];
            if a == f64::NEG_INFINITY {
                continue;
            }
            for input in 0..2usize {
                let (next_state, output) = trellis.next[s][input];
                let candidate = a + gamma(i, output);
                let cell = &mut next[next_state as usize];
                *cell = max_star.combine(*cell, candidate);
            }
        }
        normalize(next);
    }

    // Backward recursion from the terminated zero state.
    beta[stages * NUM_STATES] = 0.0;
    for i in (0..stages).rev() {
        let (head, tail) = beta.split_at_mut((i + 1) * NUM_STATES);
        let cur = &mut head[i * NUM_STATES..];
        let next = &tail[..NUM_STATES];
        for s in 0..NUM_STATES {
            let mut acc = f64::NEG_INFINITY;
            for input in 0..2usize {
                let (next_state, output) = trellis.next[s][input];
                let b = next[next_state as usize];
                if b == f64::NEG_INFINITY {
                    continue;
                }
                acc = max_star.combine(acc, gamma(i, output) + b);
            }
            cur[s] = acc;
        }
        normalize(&mut cur[..NUM_STATES]);
    }

    // Completion: info-bit posteriors and coded-bit extrinsics.
    let mut info_llrs = Vec::with_capacity(stages);
    let mut coded_extrinsic = vec![0.0f64; coded_llrs.len()];
    for i in 0..stages {
        let a_row = &alpha[i * NUM_STATES..(i + 1) * NUM_STATES];
        let b_row = &beta[(i + 1) * NUM_STATES..(i + 2) * NUM_STATES];

        let mut info_acc = [f64::NEG_INFINITY; 2];
        let mut coded_acc = [[f64::NEG_INFINITY; 2]; MOTHER_OUTPUTS];
        for s in 0..NUM_STATES {
            let a = a_row[s];
            if a == f64::NEG_INFINITY {
                continue;
            }
            for input in 0..2usize {
                let (next_state, output) = trellis.next[s][input];
                let b = b_row[next_state as usize];
                if b == f64::NEG_INFINITY {
                    continue;
                }
                let metric = a + gamma(i, output) + b;
                info_acc[input] = max_star.combine(info_acc[input], metric);
                for j in 0..MOTHER_OUTPUTS {
                    let bit = ((output >> j) & 1) as usize;
                    coded_acc[j][bit] = max_star.combine(coded_acc[j][bit], metric);
                }
            }
        }
        info_llrs.push(info_acc[1] - info_acc[0]);
        for j in 0..MOTHER_OUTPUTS {
            let pos = i * MOTHER_OUTPUTS + j;
            let posterior = coded_acc[j][1] - coded_acc[j][0];
            coded_extrinsic[pos] = posterior - coded_llrs[pos];
        }
    }

    OuterDecode {
        info_llrs,
        coded_extrinsic,
    }
}

/// Symbol-level trellis of the accumulate-PPM inner code: two states (the
/// accumulator bit at the symbol boundary), one edge per PPM value.
#[derive(Debug, Clone)]
pub struct InnerTrellis {
    bits_per_symbol: usize,
    /// `edges[state][symbol] = (next_state, input bit mask, MSB first)`
    edges: [Vec<(u8, u16)>; 2],
}

impl InnerTrellis {
    pub fn new(ppm_order: usize) -> Self {
        let m = ppm_order.trailing_zeros() as usize;
        let mut edges = [Vec::with_capacity(ppm_order), Vec::with_capacity(ppm_order)];
        for (state, table) in edges.iter_mut().enumerate() {
            for symbol in 0..ppm_order as u16 {
                let mut prev = state as u16;
                let mut input_mask = 0u16;
                for j in 0..m {
                    let y = (symbol >> (m - 1 - j)) & 1;
                    let x = y ^ prev;
                    input_mask |= x << (m - 1 - j);
                    prev = y;
                }
                table.push((prev as u8, input_mask));
            }
        }
        Self {
            bits_per_symbol: m,
            edges,
        }
    }

    #[inline]
    fn input_bit(&self, mask: u16, j: usize) -> usize {
        ((mask >> (self.bits_per_symbol - 1 - j)) & 1) as usize
    }
}

/// One SISO pass over the inner APPM trellis.
///
/// `channel_llrs` has one row per symbol stage and one column per PPM value;
/// `priors` holds one LLR per accumulator input bit. Returns the extrinsic
/// LLRs on those input bits: posteriors with the prior subtracted (the
/// channel term attaches to output symbols, not input bits, so nothing else
/// is intrinsic here).
pub fn appm_siso(
    inner: &InnerTrellis,
    channel_llrs: ArrayView2<'_, f64>,
    priors: &[f64],
    max_star: &MaxStar,
    scratch: &mut BcjrScratch,
) -> Vec<f64> {
    let stages = channel_llrs.nrows();
    let m = inner.bits_per_symbol;
    let ppm_order = channel_llrs.ncols();
    debug_assert_eq!(priors.len(), stages * m);

    let (alpha, beta) = scratch.reset((stages + 1) * 2);

    let gamma = |stage: usize, state: usize, symbol: usize| -> f64 {
        let (_, mask) = inner.edges[state][symbol];
        let mut g = channel_llrs[(stage, symbol)];
        for j in 0..m {
            if inner.input_bit(mask, j) == 1 {
                g += priors[stage * m + j];
            }
        }
        g
    };

    // Accumulator resets to zero at the codeword boundary.
    alpha[0] = 0.0;
    for i in 0..stages {
        let mut next = [f64::NEG_INFINITY; 2];
        for state in 0..2usize {
            let a = alpha[i * 2 + state];
            if a == f64::NEG_INFINITY {
                continue;
            }
            for symbol in 0..ppm_order {
                let (next_state, _) = inner.edges[state][symbol];
                let cell = &mut next[next_state as usize];
                *cell = max_star.combine(*cell, a + gamma(i, state, symbol));
            }
        }
        normalize(&mut next);
        alpha[(i + 1) * 2] = next[0];
        alpha[(i + 1) * 2 + 1] = next[1];
    }

    // The final accumulator state is unconstrained.
    beta[stages * 2] = 0.0;
    beta[stages * 2 + 1] = 0.0;
    for i in (0..stages).rev() {
        let mut cur = [f64::NEG_INFINITY; 2];
        for state in 0..2usize {
            for symbol in 0..ppm_order {
                let (next_state, _) = inner.edges[state][symbol];
                let b = beta[(i + 1) * 2 + next_state as usize];
                if b == f64::NEG_INFINITY {
                    continue;
                }
                cur[state] = max_star.combine(cur[state], gamma(i, state, symbol) + b);
            }
        }
        normalize(&mut cur);
        beta[i * 2] = cur[0];
        beta[i * 2 + 1] = cur[1];
    }

    let mut extrinsic = vec![0.0f64; stages * m];
    for i in 0..stages {
        let mut acc = vec![[f64::NEG_INFINITY; 2]; m];
        for state in 0..2usize {
            let a = alpha[i * 2 + state];
            if a == f64::NEG_INFINITY {
                continue;
            }
            for symbol in 0..ppm_order {
                let (next_state, mask) = inner.edges[state][symbol];
                let metric = a + gamma(i, state, symbol) + beta[(i + 1) * 2 + next_state as usize];
                for j in 0..m {
                    let bit = inner.input_bit(mask, j);
                    acc[j][bit] = max_star.combine(acc[j][bit], metric);
                }
            }
        }
        for j in 0..m {
            let pos = i * m + j;
            extrinsic[pos] = acc[j][1] - acc[j][0] - priors[pos];
        }
    }
    extrinsic
}

/// Collapse per-symbol LLRs straight to bit LLRs, used when the inner
/// accumulator is disabled and symbols carry the interleaved bits directly.
pub fn symbol_llrs_to_bit_llrs(
    channel_llrs: ArrayView2<'_, f64>,
    bits_per_symbol: usize,
    max_star: &MaxStar,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(channel_llrs.nrows() * bits_per_symbol);
    for row in channel_llrs.rows() {
        for j in 0..bits_per_symbol {
            let mut acc = [f64::NEG_INFINITY; 2];
            for (symbol, &llr) in row.iter().enumerate() {
                let bit = (symbol >> (bits_per_symbol - 1 - j)) & 1;
                acc[bit] = max_star.combine(acc[bit], llr);
            }
            out.push(acc[1] - acc[0]);
        }
    }
    out
}

#[inline]
fn normalize(values: &mut [f64]) {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() {
        for v in values.iter_mut() {
            *v -= max;
        }
    }
}
