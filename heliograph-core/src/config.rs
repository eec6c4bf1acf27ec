//! Session configuration and derived parameters for the SCPPM pipeline.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::errors::ConfigError;

/// Number of coded bits in one SCPPM codeword, fixed by CCSDS 142.
pub const CODED_BITS_PER_CODEWORD: usize = 15120;

/// CRC width at the head of each information block.
pub const CRC_BITS: usize = 32;

/// Outer-code termination tail (memory of the 64-state code).
pub const TAIL_BITS: usize = 6;

/// Outer code rate, fixed per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeRate {
    OneThird,
    OneHalf,
    TwoThirds,
}

impl CodeRate {
    /// Information block size in bits (CRC and tail included).
    pub fn information_block_bits(self) -> usize {
        match self {
            CodeRate::OneThird => 5040,
            CodeRate::OneHalf => 7560,
            CodeRate::TwoThirds => 10080,
        }
    }

    /// Payload bits carried per codeword once CRC and tail are reserved.
    pub fn payload_bits(self) -> usize {
        self.information_block_bits() - CRC_BITS - TAIL_BITS
    }
}

impl fmt::Display for CodeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeRate::OneThird => write!(f, "1/3"),
            CodeRate::OneHalf => write!(f, "1/2"),
            CodeRate::TwoThirds => write!(f, "2/3"),
        }
    }
}

impl FromStr for CodeRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1/3" => Ok(CodeRate::OneThird),
            "1/2" => Ok(CodeRate::OneHalf),
            "2/3" => Ok(CodeRate::TwoThirds),
            other => Err(format!("unknown code rate '{other}', expected 1/3, 1/2 or 2/3")),
        }
    }
}

/// User-facing session configuration.
///
/// This is the enumerated options value from the interface contract: unknown
/// fields are refused by serde, defaults match the lab setup of the reference
/// link (8-PPM, rate 2/3, two-branch interleaver).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SessionConfig {
    /// PPM order M, power of two in 4..=256
    pub ppm_order: usize,
    #[serde_as(as = "DisplayFromStr")]
    pub code_rate: CodeRate,
    /// Base delay of the channel interleaver, in symbols
    pub b_interleaver: usize,
    /// Number of channel interleaver branches
    pub n_interleaver: usize,
    pub use_randomizer: bool,
    pub use_inner_encoder: bool,
    /// Slot duration in seconds (transmit clock)
    pub slot_length: f64,
    pub num_samples_per_slot: usize,
    pub max_turbo_iters: usize,
    /// Acceptance threshold K for CSM correlation peaks
    pub csm_threshold_k: f64,
    /// Reject pulses further than 3 sigma from the slot center (sigma = 0.1 slot)
    pub timing_gate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ppm_order: 8,
            code_rate: CodeRate::TwoThirds,
            b_interleaver: 2520,
            n_interleaver: 2,
            use_randomizer: true,
            use_inner_encoder: true,
            slot_length: 1.0e-8,
            num_samples_per_slot: 16,
            max_turbo_iters: 10,
            csm_threshold_k: 4.0,
            timing_gate: false,
        }
    }
}

/// Validated, immutable session parameters.
///
/// Built once at session start and threaded explicitly to every component;
/// there is no ambient parameter state anywhere in the crate.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub config: SessionConfig,
    /// Bits per PPM symbol, log2(M)
    pub bits_per_symbol: usize,
    pub num_guard_slots: usize,
    pub slots_per_symbol: usize,
    pub symbols_per_codeword: usize,
    pub symbol_length: f64,
}

impl SessionParams {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        let m = config.ppm_order;
        if !m.is_power_of_two() || !(4..=256).contains(&m) {
            return Err(ConfigError::InvalidPpmOrder { order: m });
        }
        let bits_per_symbol = m.trailing_zeros() as usize;
        let num_guard_slots = m / 4;
        let slots_per_symbol = m + num_guard_slots;
        if num_guard_slots * 4 != m || slots_per_symbol <= m {
            return Err(ConfigError::GuardSlotMismatch {
                guards: num_guard_slots,
                slots_per_symbol,
            });
        }
        let symbols_per_codeword = CODED_BITS_PER_CODEWORD / bits_per_symbol;

        if config.b_interleaver == 0 || config.n_interleaver == 0 {
            return Err(ConfigError::InterleaverZero {
                b: config.b_interleaver,
                n: config.n_interleaver,
            });
        }
        let product = config.b_interleaver * config.n_interleaver;
        if product % symbols_per_codeword != 0 {
            return Err(ConfigError::InterleaverNotAligned {
                product,
                symbols_per_codeword,
            });
        }
        if !(config.slot_length.is_finite() && config.slot_length > 0.0) {
            return Err(ConfigError::InvalidSlotLength {
                seconds: config.slot_length,
            });
        }
        if config.max_turbo_iters == 0 {
            return Err(ConfigError::ZeroIterations);
        }

        let symbol_length = slots_per_symbol as f64 * config.slot_length;
        Ok(Self {
            config,
            bits_per_symbol,
            num_guard_slots,
            slots_per_symbol,
            symbols_per_codeword,
            symbol_length,
        })
    }

    pub fn ppm_order(&self) -> usize {
        self.config.ppm_order
    }

    pub fn code_rate(&self) -> CodeRate {
        self.config.code_rate
    }

    /// Null symbols emitted by the channel interleaver pipeline in total
    /// (N(N-1)B/2 of priming at the head, the same again of tail flush).
    pub fn interleaver_fill_symbols(&self) -> usize {
        let n = self.config.n_interleaver;
        n * (n - 1) * self.config.b_interleaver
    }

    /// Whole codewords added to the stream by interleaver fill.
    pub fn interleaver_fill_codewords(&self) -> usize {
        self.interleaver_fill_symbols() / self.symbols_per_codeword
    }
}
