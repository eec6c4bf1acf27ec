//! Outer convolutional code: trellis tables and rate puncturing.
//!
//! The mother code is the rate-1/3, constraint-length-7 code with octal
//! generators 133/171/165 (64 states). Rates 1/2 and 2/3 puncture the mother
//! output with fixed patterns known to both ends; the decoder re-inserts
//! zero LLRs at punctured positions before running BCJR.

use crate::config::CodeRate;

/// Generator taps, 7 bits each, bit 6 weighting the current input.
const GENERATORS: [u8; 3] = [0b101_1011, 0b111_1001, 0b111_0101];

/// Outputs per input bit of the mother code.
pub const MOTHER_OUTPUTS: usize = 3;

/// Memory of the code; also the number of termination bits.
pub const MEMORY: usize = 6;

pub const NUM_STATES: usize = 1 << MEMORY;

/// One reverse-table entry: an edge arriving at some state.
#[derive(Debug, Clone, Copy)]
pub struct Predecessor {
    pub prev_state: u8,
    pub input: u8,
    /// Output bits packed as bit j = generator j
    pub output: u8,
}

/// Forward and reverse edge tables of the outer trellis.
#[derive(Debug, Clone)]
pub struct OuterTrellis {
    /// `next[state][input] = (next_state, output_bits)`
    pub next: Vec<[(u8, u8); 2]>,
    /// `preds[state]` lists every `(prev_state, input, output_bits)` edge into `state`
    pub preds: Vec<Vec<Predecessor>>,
}

impl OuterTrellis {
    pub fn new() -> Self {
        let mut next = vec![[(0u8, 0u8); 2]; NUM_STATES];
        let mut preds: Vec<Vec<Predecessor>> = vec![Vec::with_capacity(2); NUM_STATES];

        for state in 0..NUM_STATES as u8 {
            for input in 0..2u8 {
                let (next_state, output) = step(state, input);
                next[state as usize][input as usize] = (next_state, output);
                preds[next_state as usize].push(Predecessor {
                    prev_state: state,
                    input,
                    output,
                });
            }
        }

        Self { next, preds }
    }
}

impl Default for OuterTrellis {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the shift register by one input bit.
///
/// State bit 5 is the most recent past input; the full 7-bit register puts
/// the current input at bit 6 so each generator mask applies directly.
#[inline]
fn step(state: u8, input: u8) -> (u8, u8) {
    let register = (input << 6) | state;
    let mut output = 0u8;
    for (j, &g) in GENERATORS.iter().enumerate() {
        output |= parity(register & g) << j;
    }
    let next_state = register >> 1;
    (next_state, output)
}

#[inline]
fn parity(v: u8) -> u8 {
    (v.count_ones() & 1) as u8
}

/// Encode an information block (termination tail included by the caller)
/// into the full mother-code bit stream, starting and ending in state zero.
pub fn convolutional_encode(trellis: &OuterTrellis, info_bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(info_bits.len() * MOTHER_OUTPUTS);
    let mut state = 0u8;
    for &bit in info_bits {
        let (next_state, output) = trellis.next[state as usize][(bit & 1) as usize];
        for j in 0..MOTHER_OUTPUTS {
            out.push((output >> j) & 1);
        }
        state = next_state;
    }
    out
}

/// Puncture pattern over the mother output stream, repeated cyclically.
/// Patterns are sized so each information block of k bits punctures to
/// exactly 15120 coded bits.
pub fn puncture_pattern(rate: CodeRate) -> &'static [bool] {
    match rate {
        CodeRate::OneThird => &[true, true, true],
        CodeRate::OneHalf => &[true, true, false],
        CodeRate::TwoThirds => &[true, true, false, true, false, false],
    }
}

/// Drop mother-code bits at the punctured positions.
pub fn puncture(mother_bits: &[u8], rate: CodeRate) -> Vec<u8> {
    let pattern = puncture_pattern(rate);
    mother_bits
        .iter()
        .enumerate()
        .filter(|(i, _)| pattern[i % pattern.len()])
        .map(|(_, &b)| b)
        .collect()
}

/// Expand punctured LLRs back to mother-code length, zero (erasure) at the
/// punctured positions.
pub fn depuncture_llrs(llrs: &[f64], mother_len: usize, rate: CodeRate) -> Vec<f64> {
    let pattern = puncture_pattern(rate);
    let mut out = vec![0.0f64; mother_len];
    let mut src = llrs.iter();
    for (i, slot) in out.iter_mut().enumerate() {
        if pattern[i % pattern.len()] {
            *slot = src.next().copied().unwrap_or(0.0);
        }
    }
    out
}

/// Keep only the surviving positions of a mother-length LLR stream.
pub fn puncture_llrs(llrs: &[f64], rate: CodeRate) -> Vec<f64> {
    let pattern = puncture_pattern(rate);
    llrs.iter()
        .enumerate()
        .filter(|(i, _)| pattern[i % pattern.len()])
        .map(|(_, &l)| l)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodeRate;

    #[test]
    fn trellis_has_two_edges_per_state_both_ways() {
        let trellis = OuterTrellis::new();
        assert_eq!(trellis.next.len(), NUM_STATES);
        for preds in &trellis.preds {
            assert_eq!(preds.len(), 2);
        }
    }

    #[test]
    fn zero_tail_terminates_in_zero_state() {
        let trellis = OuterTrellis::new();
        let mut state = 0u8;
        let info = [1, 1, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        for &bit in &info {
            state = trellis.next[state as usize][bit as usize].0;
        }
        // Six trailing zeros flush the register.
        assert_eq!(state, 0);
    }

    #[test]
    fn encode_output_length() {
        let trellis = OuterTrellis::new();
        let info = vec![1u8; 100];
        assert_eq!(convolutional_encode(&trellis, &info).len(), 300);
    }

    #[test]
    fn puncture_lengths_match_code_rates() {
        let trellis = OuterTrellis::new();
        for (rate, k) in [
            (CodeRate::OneThird, 5040),
            (CodeRate::OneHalf, 7560),
            (CodeRate::TwoThirds, 10080),
        ] {
            let info = vec![0u8; k];
            let mother = convolutional_encode(&trellis, &info);
            assert_eq!(puncture(&mother, rate).len(), 15120);
        }
    }

    #[test]
    fn depuncture_restores_surviving_positions() {
        let mother_len = 30;
        let llrs: Vec<f64> = (0..mother_len).map(|i| i as f64 + 1.0).collect();
        let rate = CodeRate::TwoThirds;
        let punctured = puncture_llrs(&llrs, rate);
        let restored = depuncture_llrs(&punctured, mother_len, rate);
        let pattern = puncture_pattern(rate);
        for i in 0..mother_len {
            if pattern[i % pattern.len()] {
                assert_eq!(restored[i], llrs[i]);
            } else {
                assert_eq!(restored[i], 0.0);
            }
        }
    }
}
