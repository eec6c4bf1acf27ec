//! Streaming decode: incremental event ingestion and a bounded worker pool.
//!
//! Timestamp chunks arrive as the time tagger drains its buffer; codewords
//! are handed to a fixed pool of workers through a bounded queue, so the
//! producer blocks at codeword boundaries when decoding falls behind.
//! Results are reassembled in codeword-index order regardless of completion
//! order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel;

use crate::bcjr::BcjrScratch;
use crate::config::SessionParams;
use crate::demodulator::demodulate;
use crate::diagnostics::{DecodeOutput, DecodeReport};
use crate::errors::{DecoderError, HeliographError, Result};
use crate::frame_sync::synchronize;
use crate::interleaver::channel_deinterleave;
use crate::llr::{build_llrs, estimate_rates, ChannelRates};
use crate::logging::{LinkLogger, LogConfig};
use crate::turbo::{decode_codeword, CodewordResult, DecoderTables};

/// Incremental decoder fed from a live event source.
pub struct StreamingDecoder {
    params: SessionParams,
    tables: Arc<DecoderTables>,
    logger: LinkLogger,
    cancel: Arc<AtomicBool>,
    timestamps: Vec<f64>,
    workers: usize,
    queue_depth: usize,
}

impl StreamingDecoder {
    pub fn new(params: SessionParams) -> Self {
        let tables = Arc::new(DecoderTables::new(&params));
        Self {
            params,
            tables,
            logger: LinkLogger::new(LogConfig::default()),
            cancel: Arc::new(AtomicBool::new(false)),
            timestamps: Vec::new(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            queue_depth: 4,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn logger(&self) -> &LinkLogger {
        &self.logger
    }

    /// Buffer another chunk of photon arrival times.
    pub fn feed(&mut self, timestamps: &[f64]) {
        self.timestamps.extend_from_slice(timestamps);
    }

    /// Number of events buffered so far.
    pub fn buffered_events(&self) -> usize {
        self.timestamps.len()
    }

    /// End of stream: demodulate, synchronize, and decode everything
    /// buffered, draining the worker queue before returning.
    pub fn finish(&mut self, start_time: Option<f64>) -> Result<DecodeOutput> {
        let demod = demodulate(&self.timestamps, start_time, &self.params)?;
        self.logger.info(
            "DEMOD",
            format!(
                "{} frames from {} events, {} dark count(s)",
                demod.num_frames,
                self.timestamps.len(),
                demod.dark_counts
            ),
        );

        let sync = synchronize(&demod.symbols, &self.params, &mut self.logger)?;
        let rates = estimate_rates(
            &demod.symbols,
            &sync.csm_positions,
            demod.dark_counts,
            &self.params,
        );

        let transmit_order: Vec<_> = sync.codewords.iter().flatten().copied().collect();
        let deinterleaved = channel_deinterleave(&transmit_order, &self.params);
        let spc = self.params.symbols_per_codeword;
        if deinterleaved.len() < spc {
            return Err(HeliographError::Decoder(DecoderError::StreamTooShort {
                symbols: deinterleaved.len(),
                symbols_per_codeword: spc,
            }));
        }

        let chunks: Vec<Vec<_>> = deinterleaved.chunks_exact(spc).map(<[_]>::to_vec).collect();
        let results = self.decode_pooled(chunks, rates)?;

        let total = results.len();
        let cancelled = results.iter().any(Option::is_none);
        let mut bits = Vec::new();
        let mut iterations_used = Vec::new();
        let mut uncorrectable = Vec::new();
        let mut completed = 0usize;
        for (index, result) in results.into_iter().enumerate() {
            let Some(result) = result else { break };
            completed += 1;
            iterations_used.push(result.iterations);
            if !result.crc_ok {
                uncorrectable.push(index);
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

        Ok(DecodeOutput {
            bits,
            report: DecodeReport {
                csm_positions: sync.csm_positions,
                iterations_used,
                uncorrectable_codewords: uncorrectable,
                dark_counts: demod.dark_counts,
                payload_codewords: completed,
                ber_pre: None,
                ber_post: None,
                cancelled,
            },
        })
    }

    /// Push codeword jobs through a bounded queue to the worker pool and
    /// reassemble results by index.
    fn decode_pooled(
        &self,
        chunks: Vec<Vec<crate::ppm::Detected>>,
        rates: ChannelRates,
    ) -> Result<Vec<Option<CodewordResult>>> {
        let total = chunks.len();
        let mut results: Vec<Option<CodewordResult>> = Vec::with_capacity(total);
        results.resize_with(total, || None);

        let (job_tx, job_rx) = channel::bounded::<(usize, Vec<crate::ppm::Detected>)>(
            self.queue_depth,
        );
        let (result_tx, result_rx) = channel::unbounded::<(usize, CodewordResult)>();

        crossbeam::thread::scope(|scope| {
            for _ in 0..self.workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancel = Arc::clone(&self.cancel);
                let tables = Arc::clone(&self.tables);
                let params = &self.params;
                scope.spawn(move |_| {
                    let mut scratch = BcjrScratch::new();
                    for (index, chunk) in job_rx.iter() {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        let llrs = build_llrs(&chunk, rates, params);
                        let result = decode_codeword(llrs.view(), params, &tables, &mut scratch);
                        if result_tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            // Producer: blocks here when the queue is full.
            for (index, chunk) in chunks.into_iter().enumerate() {
                if self.cancel.load(Ordering::Relaxed) {
                    break;
                }
                if job_tx.send((index, chunk)).is_err() {
                    break;
                }
            }
            drop(job_tx);

            for (index, result) in result_rx.iter() {
                results[index] = Some(result);
            }
        })
        .expect("decode worker panicked");

        // Cancellation may leave holes; keep only the completed prefix so
        // the output stream stays contiguous and ordered.
        if let Some(first_gap) = results.iter().position(Option::is_none) {
            for slot in results.iter_mut().skip(first_gap) {
                *slot = None;
            }
        }
        Ok(results)
    }
}
