//! Decode sessions: frame-synchronized, parallel codeword decoding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use rayon::prelude::*;

use crate::bcjr::BcjrScratch;
use crate::config::SessionParams;
use crate::demodulator::demodulate;
use crate::diagnostics::{pre_decode_ber, DecodeOutput, DecodeReport};
use crate::errors::{DecoderError, HeliographError, Result};
use crate::frame_sync::synchronize;
use crate::interleaver::channel_deinterleave;
use crate::llr::{build_llrs, estimate_rates, ChannelRates};
use crate::logging::{LinkLogger, LogConfig};
use crate::ppm::{slot_demap, Detected};
use crate::turbo::{decode_codeword, CodewordResult, DecoderTables};

/// One decoding session over a received stream.
///
/// Owns the read-only trellis tables shared by the worker pool and a
/// cooperative cancellation token checked between codewords. Codewords are
/// decoded in parallel but the output bit stream is assembled in
/// codeword-index order.
pub struct DecoderSession {
    params: SessionParams,
    tables: DecoderTables,
    logger: LinkLogger,
    cancel: Arc<AtomicBool>,
    /// Fixed channel rates instead of the CSM-region estimate
    rates_override: Option<ChannelRates>,
    /// Transmitted symbol stream for pre-decode BER, when available
    reference_symbols: Option<Vec<u16>>,
}

impl DecoderSession {
    pub fn new(params: SessionParams) -> Self {
        let tables = DecoderTables::new(&params);
        Self {
            params,
            tables,
            logger: LinkLogger::new(LogConfig::default()),
            cancel: Arc::new(AtomicBool::new(false)),
            rates_override: None,
            reference_symbols: None,
        }
    }

    pub fn with_log_config(mut self, config: LogConfig) -> Self {
        self.logger = LinkLogger::new(config);
        self
    }

    /// Pin the channel rates instead of estimating them from CSM regions.
    pub fn with_channel_rates(mut self, rates: ChannelRates) -> Self {
        self.rates_override = Some(rates);
        self
    }

    /// Provide the transmitted symbol stream so the report carries a
    /// pre-decode bit error ratio.
    pub fn with_reference_symbols(mut self, symbols: Vec<u16>) -> Self {
        self.reference_symbols = Some(symbols);
        self
    }

    /// Token that aborts the session between codewords when set.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn logger(&self) -> &LinkLogger {
        &self.logger
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Decode a slot-mapped symbol matrix (rows = symbols, CSMs included).
    pub fn decode_slot_matrix(&mut self, matrix: &Array2<u8>) -> Result<DecodeOutput> {
        if matrix.ncols() != self.params.slots_per_symbol {
            return Err(HeliographError::Decoder(DecoderError::SlotMatrixShape {
                cols: matrix.ncols(),
                expected: self.params.slots_per_symbol,
            }));
        }
        let stream = slot_demap(matrix, &self.params);
        self.decode_symbols(&stream, 0)
    }

    /// Demodulate a photon timestamp stream, then decode it.
    pub fn decode_timestamps(
        &mut self,
        timestamps: &[f64],
        start_time: Option<f64>,
    ) -> Result<DecodeOutput> {
        let demod = demodulate(timestamps, start_time, &self.params)?;
        self.logger.info(
            "DEMOD",
            format!(
                "{} frames, {} dark count(s)",
                demod.num_frames, demod.dark_counts
            ),
        );
        self.decode_symbols(&demod.symbols, demod.dark_counts)
    }

    /// Decode an already-demodulated symbol stream.
    pub fn decode_symbols(
        &mut self,
        stream: &[Detected],
        dark_counts: usize,
    ) -> Result<DecodeOutput> {
        let params = &self.params;
        let sync = synchronize(stream, params, &mut self.logger)?;

        let rates = self.rates_override.unwrap_or_else(|| {
            estimate_rates(stream, &sync.csm_positions, dark_counts, params)
        });
        self.logger.info(
            "DEMOD",
            format!(
                "channel rates: signal {:.3}, background {:.5}",
                rates.signal, rates.background
            ),
        );

        // Undo the channel interleaver once, outside the turbo loop. The
        // fill regions deinterleave to erasures and whole fill codewords
        // fall off the head of the stream.
        let transmit_order: Vec<Detected> = sync.codewords.iter().flatten().copied().collect();
        let deinterleaved = channel_deinterleave(&transmit_order, params);
        let spc = params.symbols_per_codeword;
        if deinterleaved.len() < spc {
            return Err(HeliographError::Decoder(DecoderError::StreamTooShort {
                symbols: deinterleaved.len(),
                symbols_per_codeword: spc,
            }));
        }
        let payload_codewords = deinterleaved.len() / spc;
        self.logger.info(
            "FEC",
            format!("decoding {payload_codewords} codeword(s)"),
        );

        let tables = &self.tables;
        let cancel = Arc::clone(&self.cancel);
        let results: Vec<Option<CodewordResult>> = deinterleaved
            .par_chunks_exact(spc)
            .map_init(BcjrScratch::new, |scratch, chunk| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                let llrs = build_llrs(chunk, rates, params);
                Some(decode_codeword(llrs.view(), params, tables, scratch))
            })
            .collect();

        self.assemble(results, sync.csm_positions, dark_counts, stream)
    }

    /// Stitch per-codeword results into the ordered output bit stream.
    fn assemble(
        &mut self,
        results: Vec<Option<CodewordResult>>,
        csm_positions: Vec<usize>,
        dark_counts: usize,
        stream: &[Detected],
    ) -> Result<DecodeOutput> {
        let total = results.len();
        let cancelled = results.iter().any(Option::is_none);

        let mut bits = Vec::new();
        let mut iterations_used = Vec::with_capacity(total);
        let mut uncorrectable = Vec::new();
        let mut completed = 0usize;
        for (index, result) in results.into_iter().enumerate() {
            let Some(result) = result else { break };
            completed += 1;
            iterations_used.push(result.iterations);
            if !result.crc_ok {
                uncorrectable.push(index);
                self.logger.warn(
                    "TURBO",
                    format!(
                        "codeword {index} uncorrectable after {} iteration(s)",
                        result.iterations
                    ),
                );
            }
            bits.extend(result.payload);
        }

        if completed > 0 && uncorrectable.len() == completed {
            return Err(HeliographError::Decoder(DecoderError::AllCodewordsFailed {
                codewords: completed,
                iterations: self.params.config.max_turbo_iters,
            }));
        }
        if cancelled {
            self.logger.warn(
                "TURBO",
                format!("cancelled after {completed}/{total} codeword(s)"),
            );
        }

        let ber_pre = self.reference_symbols.as_ref().and_then(|reference| {
            pre_decode_ber(stream, reference, self.params.bits_per_symbol)
        });

        let report = DecodeReport {
            csm_positions,
            iterations_used,
            uncorrectable_codewords: uncorrectable,
            dark_counts,
            payload_codewords: completed,
            ber_pre,
            ber_post: None,
            cancelled,
        };
        Ok(DecodeOutput { bits, report })
    }
}
