//! Heliograph core library
//!
//! Rust-native transmitter and receiver for a free-space optical link using
//! serially concatenated pulse-position modulation (SCPPM) per CCSDS 142.
//! The transmit side turns payload bits into a slot-mapped pulse schedule;
//! the receive side takes photon arrival timestamps (or a slot matrix),
//! recovers codeword framing, and runs the iterative BCJR decoder back to
//! payload bits.

pub mod bcjr;
pub mod channel;
pub mod config;
pub mod decoder;
pub mod demodulator;
pub mod diagnostics;
pub mod encoder;
pub mod errors;
pub mod frame_sync;
pub mod interleaver;
pub mod llr;
pub mod logging;
pub mod ppm;
pub mod randomizer;
pub mod streaming;
pub mod trellis;
pub mod turbo;
pub mod utils;

// Matrix types in the public API come from ndarray.
pub use ndarray;

// Re-export the canonical session interface
pub use config::{CodeRate, SessionConfig, SessionParams};
pub use decoder::DecoderSession;
pub use diagnostics::{DecodeOutput, DecodeReport};
pub use encoder::{encode, EncodedFrame};
pub use errors::{HeliographError, Result};
