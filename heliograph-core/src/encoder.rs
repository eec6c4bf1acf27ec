//! Transmit pipeline: payload bits to the slot-mapped symbol matrix.

use ndarray::Array2;

use crate::config::SessionParams;
use crate::interleaver::{bit_interleave, channel_interleave};
use crate::ppm::{csm_for_order, insert_csms, slot_map};
use crate::randomizer::randomize_bits;
use crate::trellis::{convolutional_encode, puncture, OuterTrellis};
use crate::turbo::build_information_block;
use crate::utils::bits_to_symbols;

/// Encoder output: the on-air slot matrix plus the intermediate symbol
/// stream kept for reference files and diagnostics.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// One row per transmitted symbol (CSMs included), one column per slot
    pub slot_matrix: Array2<u8>,
    /// The same symbols before slot mapping
    pub symbols: Vec<u16>,
    /// Codewords carrying payload (interleaver fill excluded)
    pub payload_codewords: usize,
    /// Total codewords on air, fill included
    pub total_codewords: usize,
}

/// Encode a payload bit stream.
///
/// Stage order: block framing (CRC + tail, zero padding), outer
/// convolutional encode, puncturing to the session rate, PN randomizer,
/// per-codeword bit interleaver, inner accumulator, symbol grouping,
/// channel interleaver across the codeword stream, CSM insertion, slot
/// mapping.
pub fn encode(payload: &[u8], params: &SessionParams) -> EncodedFrame {
    let trellis = OuterTrellis::new();
    let rate = params.code_rate();
    let info_bits = rate.information_block_bits();
    let capacity = rate.payload_bits();
    let m = params.bits_per_symbol;

    let payload_codewords = payload.len().div_ceil(capacity).max(1);

    // Per-codeword bit processing up to the symbol stream.
    let mut symbols: Vec<u16> =
        Vec::with_capacity(payload_codewords * params.symbols_per_codeword);
    let chunks: Vec<&[u8]> = if payload.is_empty() {
        vec![&[]]
    } else {
        payload.chunks(capacity).collect()
    };
    for chunk in chunks {
        let block = build_information_block(chunk, info_bits);
        let mother = convolutional_encode(&trellis, &block);
        let mut coded = puncture(&mother, rate);
        if params.config.use_randomizer {
            randomize_bits(&mut coded);
        }
        let mut interleaved = bit_interleave(&coded, m);
        if params.config.use_inner_encoder {
            accumulate(&mut interleaved);
        }
        symbols.extend(bits_to_symbols(&interleaved, m));
    }

    // Stream-level processing: channel interleave, CSM framing, slot map.
    let interleaved = channel_interleave(&symbols, params);
    debug_assert_eq!(interleaved.len() % params.symbols_per_codeword, 0);
    let total_codewords = interleaved.len() / params.symbols_per_codeword;
    let framed = insert_csms(&interleaved, params);
    let slot_matrix = slot_map(&framed, params);

    EncodedFrame {
        slot_matrix,
        symbols: framed,
        payload_codewords,
        total_codewords,
    }
}

/// Rate-1 accumulator over a codeword's bit stream: `y[i] = x[i] ^ y[i-1]`,
/// reset at the codeword boundary.
fn accumulate(bits: &mut [u8]) {
    let mut previous = 0u8;
    for b in bits.iter_mut() {
        previous ^= *b;
        *b = previous;
    }
}

/// Calibration pattern: `count` repetitions of `symbol` closed by a single
/// zero terminator, slot-mapped directly without coding. When `framed` is
/// set, CSMs are inserted at codeword boundaries (the stream is padded to a
/// whole number of codewords first).
pub fn calibration_pattern(
    symbol: u16,
    count: usize,
    framed: bool,
    params: &SessionParams,
) -> EncodedFrame {
    let mut symbols = vec![symbol; count];
    symbols.push(0);

    let spc = params.symbols_per_codeword;
    let framed_symbols = if framed {
        let fill = (spc - symbols.len() % spc) % spc;
        symbols.extend(std::iter::repeat(0).take(fill));
        insert_csms(&symbols, params)
    } else {
        symbols
    };

    let codewords = framed_symbols.len() / (spc + csm_for_order(params.ppm_order()).len());
    EncodedFrame {
        slot_matrix: slot_map(&framed_symbols, params),
        symbols: framed_symbols,
        payload_codewords: codewords,
        total_codewords: codewords,
    }
}
