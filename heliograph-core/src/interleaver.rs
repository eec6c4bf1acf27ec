//! Channel (Forney) symbol interleaver and per-codeword bit interleaver.

use std::collections::VecDeque;

use crate::config::SessionParams;

/// Convolutional interleaver with `N` branches; branch `k` delays its
/// entries by `k * B` cells. The matching deinterleaver uses `(N-1-k) * B`
/// so every symbol sees the same total pipeline delay.
///
/// Generic over the symbol type so the transmit side can run it on plain
/// symbols and the receive side on detection results, where the `Default`
/// value doubles as the null fill.
#[derive(Debug, Clone)]
pub struct ConvolutionalInterleaver<T> {
    branches: Vec<VecDeque<T>>,
    cursor: usize,
}

impl<T: Clone + Default> ConvolutionalInterleaver<T> {
    /// Interleaver side: branch delays `0, B, 2B, ...`.
    pub fn interleaver(b: usize, n: usize) -> Self {
        Self::with_delays((0..n).map(|k| k * b).collect())
    }

    /// Deinterleaver side: branch delays `(N-1)B, (N-2)B, ..., 0`.
    pub fn deinterleaver(b: usize, n: usize) -> Self {
        Self::with_delays((0..n).map(|k| (n - 1 - k) * b).collect())
    }

    fn with_delays(delays: Vec<usize>) -> Self {
        let branches = delays
            .into_iter()
            .map(|d| {
                let mut line = VecDeque::with_capacity(d + 1);
                line.extend(std::iter::repeat_with(T::default).take(d));
                line
            })
            .collect();
        Self {
            branches,
            cursor: 0,
        }
    }

    /// Push one symbol through the commutator and pop the emerging one.
    pub fn push(&mut self, symbol: T) -> T {
        let next_cursor = (self.cursor + 1) % self.branches.len();
        let branch = &mut self.branches[self.cursor];
        self.cursor = next_cursor;
        branch.push_back(symbol);
        branch.pop_front().expect("delay line is never empty after a push")
    }

    /// Run a whole stream through, appending `flush` null symbols so the
    /// delayed tail emerges. Output length is `input.len() + flush`.
    pub fn run(&mut self, input: &[T], flush: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(input.len() + flush);
        for s in input {
            out.push(self.push(s.clone()));
        }
        for _ in 0..flush {
            out.push(self.push(T::default()));
        }
        out
    }
}

/// Interleave a symbol stream, flushing the full pipeline: the result is
/// `input.len() + N(N-1)B` symbols, null-filled at both ends of the shuffle.
pub fn channel_interleave<T: Clone + Default>(input: &[T], params: &SessionParams) -> Vec<T> {
    let b = params.config.b_interleaver;
    let n = params.config.n_interleaver;
    ConvolutionalInterleaver::interleaver(b, n).run(input, params.interleaver_fill_symbols())
}

/// Invert [`channel_interleave`]: feed the interleaved stream through the
/// mirrored delays and drop the `N(N-1)B` leading null symbols. The output
/// length equals the original pre-interleave stream length.
pub fn channel_deinterleave<T: Clone + Default>(input: &[T], params: &SessionParams) -> Vec<T> {
    let b = params.config.b_interleaver;
    let n = params.config.n_interleaver;
    let fill = params.interleaver_fill_symbols();
    let mut out = ConvolutionalInterleaver::deinterleaver(b, n).run(input, 0);
    out.drain(..fill.min(out.len()));
    out
}

/// Per-codeword block bit interleaver: write the 15120 coded bits row-major
/// into an (m x 15120/m) matrix and read column-major, so the m bits of each
/// PPM symbol come from positions 15120/m apart.
pub fn bit_interleave(bits: &[u8], bits_per_symbol: usize) -> Vec<u8> {
    let cols = bits.len() / bits_per_symbol;
    debug_assert_eq!(bits.len() % bits_per_symbol, 0);
    let mut out = Vec::with_capacity(bits.len());
    for c in 0..cols {
        for r in 0..bits_per_symbol {
            out.push(bits[r * cols + c]);
        }
    }
    out
}

/// Inverse permutation of [`bit_interleave`].
pub fn bit_deinterleave(bits: &[u8], bits_per_symbol: usize) -> Vec<u8> {
    let cols = bits.len() / bits_per_symbol;
    debug_assert_eq!(bits.len() % bits_per_symbol, 0);
    let mut out = vec![0u8; bits.len()];
    let mut src = bits.iter();
    for c in 0..cols {
        for r in 0..bits_per_symbol {
            out[r * cols + c] = *src.next().expect("length checked above");
        }
    }
    out
}

/// Apply the bit-interleaver permutation to LLRs (receive path).
pub fn bit_interleave_llrs(llrs: &[f64], bits_per_symbol: usize) -> Vec<f64> {
    let cols = llrs.len() / bits_per_symbol;
    let mut out = Vec::with_capacity(llrs.len());
    for c in 0..cols {
        for r in 0..bits_per_symbol {
            out.push(llrs[r * cols + c]);
        }
    }
    out
}

/// Apply the inverse permutation to LLRs (receive path).
pub fn bit_deinterleave_llrs(llrs: &[f64], bits_per_symbol: usize) -> Vec<f64> {
    let cols = llrs.len() / bits_per_symbol;
    let mut out = vec![0.0f64; llrs.len()];
    let mut src = llrs.iter();
    for c in 0..cols {
        for r in 0..bits_per_symbol {
            out[r * cols + c] = *src.next().expect("length checked above");
        }
    }
    out
}
