//! Turbo iteration driver: extrinsic exchange between the inner APPM SISO
//! and the outer convolutional BCJR, with CRC-gated early exit.

use ndarray::ArrayView2;

use crate::bcjr::{
    appm_siso, outer_bcjr, symbol_llrs_to_bit_llrs, BcjrScratch, InnerTrellis, MaxStar,
};
use crate::config::{SessionParams, CRC_BITS, TAIL_BITS};
use crate::interleaver::{bit_deinterleave_llrs, bit_interleave_llrs};
use crate::randomizer::randomize_llrs;
use crate::trellis::{depuncture_llrs, puncture_llrs, OuterTrellis, MOTHER_OUTPUTS};
use crate::utils::{crc32_bits, crc32_to_bits};

/// Decode outcome for a single codeword.
#[derive(Debug, Clone)]
pub struct CodewordResult {
    /// Payload bits (CRC and termination tail stripped)
    pub payload: Vec<u8>,
    /// Turbo iterations actually run
    pub iterations: usize,
    /// Whether the head CRC verified
    pub crc_ok: bool,
    /// Mean |info LLR| after each iteration, for convergence diagnostics
    pub llr_history: Vec<f64>,
}

/// Read-only decoding tables shared by all workers.
#[derive(Debug, Clone)]
pub struct DecoderTables {
    pub outer: OuterTrellis,
    pub inner: InnerTrellis,
    pub max_star: MaxStar,
}

impl DecoderTables {
    pub fn new(params: &SessionParams) -> Self {
        Self {
            outer: OuterTrellis::new(),
            inner: InnerTrellis::new(params.ppm_order()),
            max_star: MaxStar::new(),
        }
    }
}

/// Run the iterative decoder on one codeword's LLR table.
///
/// `channel_llrs` is the (symbols_per_codeword x M) table from the LLR
/// builder. The loop alternates inner and outer SISO passes, carrying
/// extrinsic information through the bit deinterleaver and derandomizer in
/// one direction and their inverses in the other. Iteration stops as soon
/// as the block CRC verifies.
pub fn decode_codeword(
    channel_llrs: ArrayView2<'_, f64>,
    params: &SessionParams,
    tables: &DecoderTables,
    scratch: &mut BcjrScratch,
) -> CodewordResult {
    let rate = params.code_rate();
    let m = params.bits_per_symbol;
    let info_bits = rate.information_block_bits();
    let mother_len = info_bits * MOTHER_OUTPUTS;
    let coded_len = channel_llrs.nrows() * m;
    let use_randomizer = params.config.use_randomizer;

    if !params.config.use_inner_encoder {
        // No inner code: one outer pass on directly demapped bit LLRs.
        let bit_llrs = symbol_llrs_to_bit_llrs(channel_llrs, m, &tables.max_star);
        let mut coded = bit_deinterleave_llrs(&bit_llrs, m);
        if use_randomizer {
            randomize_llrs(&mut coded);
        }
        let mother = depuncture_llrs(&coded, mother_len, rate);
        let out = outer_bcjr(&tables.outer, &mother, &tables.max_star, scratch);
        return finish(&out.info_llrs, 1, vec![mean_abs(&out.info_llrs)]);
    }

    let mut inner_priors = vec![0.0f64; coded_len];
    let mut llr_history = Vec::with_capacity(params.config.max_turbo_iters);
    let mut last_info: Vec<f64> = Vec::new();

    for iteration in 1..=params.config.max_turbo_iters {
        let inner_ext = appm_siso(
            &tables.inner,
            channel_llrs,
            &inner_priors,
            &tables.max_star,
            scratch,
        );

        let mut coded = bit_deinterleave_llrs(&inner_ext, m);
        if use_randomizer {
            randomize_llrs(&mut coded);
        }
        let mother = depuncture_llrs(&coded, mother_len, rate);
        let out = outer_bcjr(&tables.outer, &mother, &tables.max_star, scratch);

        llr_history.push(mean_abs(&out.info_llrs));
        let crc_ok = crc_verifies(&out.info_llrs, info_bits);
        last_info = out.info_llrs;

        if crc_ok {
            return finish(&last_info, iteration, llr_history);
        }

        let mut coded_ext = puncture_llrs(&out.coded_extrinsic, rate);
        if use_randomizer {
            randomize_llrs(&mut coded_ext);
        }
        inner_priors = bit_interleave_llrs(&coded_ext, m);
    }

    finish(&last_info, params.config.max_turbo_iters, llr_history)
}

fn hard_decide(llrs: &[f64]) -> Vec<u8> {
    llrs.iter().map(|&l| (l >= 0.0) as u8).collect()
}

fn crc_verifies(info_llrs: &[f64], info_bits: usize) -> bool {
    let decided = hard_decide(info_llrs);
    check_block_crc(&decided, info_bits)
}

/// Verify the head CRC of a hard-decided information block.
pub fn check_block_crc(block: &[u8], info_bits: usize) -> bool {
    if block.len() != info_bits {
        return false;
    }
    let payload = &block[CRC_BITS..info_bits - TAIL_BITS];
    let mut expected = 0u32;
    for &b in &block[..CRC_BITS] {
        expected = (expected << 1) | b as u32;
    }
    crc32_bits(payload) == expected
}

fn finish(info_llrs: &[f64], iterations: usize, llr_history: Vec<f64>) -> CodewordResult {
    let block = hard_decide(info_llrs);
    let crc_ok = check_block_crc(&block, block.len());
    let payload = if block.len() > CRC_BITS + TAIL_BITS {
        block[CRC_BITS..block.len() - TAIL_BITS].to_vec()
    } else {
        Vec::new()
    };
    CodewordResult {
        payload,
        iterations,
        crc_ok,
        llr_history,
    }
}

fn mean_abs(llrs: &[f64]) -> f64 {
    if llrs.is_empty() {
        return 0.0;
    }
    llrs.iter().map(|l| l.abs()).sum::<f64>() / llrs.len() as f64
}

/// Assemble one information block on the transmit side:
/// `[CRC-32 | payload | termination zeros]`, zero-padding short payloads.
pub fn build_information_block(payload: &[u8], info_bits: usize) -> Vec<u8> {
    let capacity = info_bits - CRC_BITS - TAIL_BITS;
    debug_assert!(payload.len() <= capacity);
    let mut padded = payload.to_vec();
    padded.resize(capacity, 0);
    let crc = crc32_bits(&padded);
    let mut block = Vec::with_capacity(info_bits);
    block.extend(crc32_to_bits(crc));
    block.extend_from_slice(&padded);
    block.extend(std::iter::repeat(0).take(TAIL_BITS));
    block
}
