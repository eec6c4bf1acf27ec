//! JSON session reports written next to decode runs.

use std::path::Path;

use chrono::{DateTime, Utc};
use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use heliograph_core::diagnostics::DecodeReport;

/// Session report persisted as JSON.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub timestamp: DateTime<Utc>,
    pub ppm_order: usize,
    pub code_rate: String,
    pub decoded_bits: usize,
    pub codewords: usize,
    pub uncorrectable_codewords: usize,
    pub mean_iterations: f64,
    pub csm_positions: Vec<usize>,
    pub dark_counts: usize,
    pub ber_pre: Option<f64>,
    pub ber_post: Option<f64>,
    pub cancelled: bool,
}

impl SessionReport {
    pub fn new(
        ppm_order: usize,
        code_rate: String,
        decoded_bits: usize,
        report: &DecodeReport,
    ) -> Self {
        let mean_iterations = if report.iterations_used.is_empty() {
            0.0
        } else {
            report.iterations_used.iter().sum::<usize>() as f64
                / report.iterations_used.len() as f64
        };
        Self {
            timestamp: Utc::now(),
            ppm_order,
            code_rate,
            decoded_bits,
            codewords: report.payload_codewords,
            uncorrectable_codewords: report.uncorrectable_codewords.len(),
            mean_iterations,
            csm_positions: report.csm_positions.clone(),
            dark_counts: report.dark_counts,
            ber_pre: report.ber_pre,
            ber_post: report.ber_post,
            cancelled: report.cancelled,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).wrap_err_with(|| format!("writing {}", path.display()))
    }

    pub fn print_summary(&self) {
        println!("codewords decoded:    {}", self.codewords);
        println!("uncorrectable:        {}", self.uncorrectable_codewords);
        println!("mean turbo iterations: {:.2}", self.mean_iterations);
        println!("dark counts:          {}", self.dark_counts);
        if let Some(ber) = self.ber_pre {
            println!("BER before decoding:  {ber:.3e}");
        }
        if let Some(ber) = self.ber_post {
            println!("BER after decoding:   {ber:.3e}");
        }
    }
}
