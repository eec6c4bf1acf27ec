//! Decode reports, error-rate accounting, and reference artifacts.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ppm::Detected;
use crate::utils::{count_bit_errors, pack_bits_lsb_first, symbols_to_bits, unpack_bits_lsb_first};

/// Session-level decode metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DecodeReport {
    /// Symbol index of each confirmed CSM
    pub csm_positions: Vec<usize>,
    /// Turbo iterations spent on each payload codeword
    pub iterations_used: Vec<usize>,
    /// Indices of codewords whose CRC never verified
    pub uncorrectable_codewords: Vec<usize>,
    /// Demodulator dark-count total (zero for slot-matrix input)
    pub dark_counts: usize,
    /// Codewords carrying payload (interleaver fill excluded)
    pub payload_codewords: usize,
    /// Bit error ratio of the raw symbol stream against a reference, if one
    /// was supplied
    pub ber_pre: Option<f64>,
    /// Bit error ratio of the decoded payload against a reference payload,
    /// if one was supplied
    pub ber_post: Option<f64>,
    /// True when the session was cancelled before all codewords finished
    pub cancelled: bool,
}

/// Decoded payload bits plus the session report.
#[derive(Debug, Clone)]
pub struct DecodeOutput {
    pub bits: Vec<u8>,
    pub report: DecodeReport,
}

/// Bit error ratio between two bit slices over their common length.
pub fn bit_error_ratio(received: &[u8], reference: &[u8]) -> Option<f64> {
    let len = received.len().min(reference.len());
    if len == 0 {
        return None;
    }
    Some(count_bit_errors(&received[..len], &reference[..len]) as f64 / len as f64)
}

/// Pre-decode BER: hard symbol decisions against the transmitted symbol
/// stream (erasures count every bit as unknown-wrong half the time in
/// expectation; here they simply compare as symbol zero, matching the
/// erasure marker convention of the demodulator).
pub fn pre_decode_ber(
    detected: &[Detected],
    reference_symbols: &[u16],
    bits_per_symbol: usize,
) -> Option<f64> {
    let hard: Vec<u16> = detected
        .iter()
        .map(|d| match d {
            Detected::Pulse(s) => *s,
            Detected::Erasure => 0,
        })
        .collect();
    let rx_bits = symbols_to_bits(&hard, bits_per_symbol);
    let tx_bits = symbols_to_bits(reference_symbols, bits_per_symbol);
    bit_error_ratio(&rx_bits, &tx_bits)
}

/// Persist a reference bit sequence, packed LSB first. Only used by tests
/// and replay tooling; the format is not an interoperability contract.
pub fn write_reference_bits(path: &Path, bits: &[u8]) -> io::Result<()> {
    let mut bytes = (bits.len() as u64).to_le_bytes().to_vec();
    bytes.extend(pack_bits_lsb_first(bits));
    std::fs::write(path, bytes)
}

/// Load a reference bit sequence written by [`write_reference_bits`].
pub fn read_reference_bits(path: &Path) -> io::Result<Vec<u8>> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < 8 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "reference file shorter than its header",
        ));
    }
    let len = u64::from_le_bytes(bytes[..8].try_into().expect("length checked")) as usize;
    let mut bits = unpack_bits_lsb_first(&bytes[8..]);
    if bits.len() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "reference file truncated",
        ));
    }
    bits.truncate(len);
    Ok(bits)
}
