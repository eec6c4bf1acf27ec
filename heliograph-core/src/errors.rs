//! Heliograph error types with granular categories

use thiserror::Error;

/// Top-level error type for all Heliograph operations
#[derive(Debug, Error)]
pub enum HeliographError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Demodulator error: {0}")]
    Demodulator(#[from] DemodulatorError),

    #[error("Frame sync error: {0}")]
    FrameSync(#[from] FrameSyncError),

    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),
}

/// Session configuration errors, refused at construction
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid PPM order: {order} (must be a power of two in 4..=256)")]
    InvalidPpmOrder { order: usize },

    #[error("Interleaver product B*N = {product} is not a multiple of {symbols_per_codeword} symbols per codeword")]
    InterleaverNotAligned {
        product: usize,
        symbols_per_codeword: usize,
    },

    #[error("Interleaver parameters must be positive: B={b}, N={n}")]
    InterleaverZero { b: usize, n: usize },

    #[error("Invalid slot length: {seconds} s (must be finite and > 0)")]
    InvalidSlotLength { seconds: f64 },

    #[error("Guard slot count {guards} inconsistent with slots per symbol {slots_per_symbol}")]
    GuardSlotMismatch {
        guards: usize,
        slots_per_symbol: usize,
    },

    #[error("Turbo iteration limit must be >= 1")]
    ZeroIterations,
}

/// Demodulator errors
#[derive(Debug, Error)]
pub enum DemodulatorError {
    #[error("Timestamp stream is empty")]
    EmptyStream,

    #[error("Timestamp stream not monotonic at index {index}: {previous} s followed by {current} s")]
    NonMonotonic {
        index: usize,
        previous: f64,
        current: f64,
    },
}

/// Frame synchronization errors; these abort the session
#[derive(Debug, Error)]
pub enum FrameSyncError {
    #[error("Found {found} CSM(s), need at least 2 to bound a codeword")]
    TooFewMarkers { found: usize },

    #[error("Implausible CSM spacing: {actual} symbols where {expected} +/- {tolerance} expected")]
    ImplausibleSpacing {
        actual: usize,
        expected: usize,
        tolerance: usize,
    },

    #[error("Symbol stream too short for correlation: {symbols} symbols, CSM is {csm_len}")]
    StreamTooShort { symbols: usize, csm_len: usize },
}

/// Decoder errors
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("All {codewords} codeword(s) failed CRC after {iterations} iterations")]
    AllCodewordsFailed {
        codewords: usize,
        iterations: usize,
    },

    #[error("Slot matrix has {cols} columns, session expects {expected}")]
    SlotMatrixShape { cols: usize, expected: usize },

    #[error("Deinterleaved stream holds {symbols} symbols, not enough for one codeword of {symbols_per_codeword}")]
    StreamTooShort {
        symbols: usize,
        symbols_per_codeword: usize,
    },
}

/// Result type alias for Heliograph operations
pub type Result<T> = std::result::Result<T, HeliographError>;
