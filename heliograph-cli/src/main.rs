mod config;
mod io;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use heliograph_core::channel::{photon_timestamps, PhotonChannelConfig};
use heliograph_core::config::SessionParams;
use heliograph_core::decoder::DecoderSession;
use heliograph_core::diagnostics::{bit_error_ratio, read_reference_bits, write_reference_bits};
use heliograph_core::encoder::encode;
use heliograph_core::logging::LogConfig;
use heliograph_core::utils::symbols_to_bits;

use config::CliConfig;
use report::SessionReport;

#[derive(Parser, Debug)]
#[command(author, version, about = "Heliograph SCPPM optical-link codec", long_about = None)]
struct Cli {
    /// Path to the TOML session configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Enable verbose diagnostic output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a payload file into a slot-mapped pulse schedule
    Encode {
        /// Payload file (raw bytes)
        #[arg(short, long)]
        input: PathBuf,
        /// Slot matrix output
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the transmitted bit sequence for later BER checks
        #[arg(long)]
        reference: Option<PathBuf>,
    },
    /// Decode a slot matrix or an event stream back to payload bytes
    Decode {
        /// Slot matrix dump, or f64 timestamps with --timestamps
        #[arg(short, long)]
        input: PathBuf,
        /// Treat the input as a photon timestamp stream
        #[arg(long)]
        timestamps: bool,
        /// Decoded payload output
        #[arg(short, long)]
        output: PathBuf,
        /// Reference bit sequence for the pre-decode BER
        #[arg(long)]
        reference: Option<PathBuf>,
        /// JSON report output
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run an end-to-end simulation over the photon channel
    Simulate {
        /// Number of random payload bits
        #[arg(long, default_value_t = 10042)]
        bits: usize,
        /// RNG seed for payload and channel
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Optional event stream dump
        #[arg(long)]
        events: Option<PathBuf>,
        /// JSON report output
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let cli_config = CliConfig::from_file(&args.config)?;
    let params = SessionParams::new(cli_config.session.clone())
        .wrap_err("invalid session configuration")?;
    let log_config = if args.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::quiet()
    };

    match args.command {
        Command::Encode {
            input,
            output,
            reference,
        } => {
            let payload = io::read_payload_bits(&input)?;
            let spinner = progress_spinner(format!(
                "encoding {} bits at rate {}",
                payload.len(),
                params.code_rate()
            ));
            let frame = encode(&payload, &params);
            spinner.finish_and_clear();

            io::write_slot_matrix(&output, &frame.slot_matrix)?;
            if let Some(reference) = reference {
                let bits = symbols_to_bits(&frame.symbols, params.bits_per_symbol);
                write_reference_bits(&reference, &bits)
                    .wrap_err_with(|| format!("writing {}", reference.display()))?;
            }
            println!(
                "{} payload codeword(s), {} symbols on air -> {}",
                frame.payload_codewords,
                frame.symbols.len(),
                output.display()
            );
        }

        Command::Decode {
            input,
            timestamps,
            output,
            reference,
            report,
        } => {
            let mut session = DecoderSession::new(params.clone()).with_log_config(log_config);
            if let Some(rates) = cli_config.rates {
                session = session.with_channel_rates(rates.into());
            }

            let spinner = progress_spinner("synchronizing and decoding".into());
            let mut out = if timestamps {
                let times = io::read_timestamps(&input)?;
                session.decode_timestamps(&times, None)?
            } else {
                let matrix = io::read_slot_matrix(&input)?;
                session.decode_slot_matrix(&matrix)?
            };
            spinner.finish_and_clear();

            if let Some(reference) = reference {
                let reference_bits = read_reference_bits(&reference)
                    .wrap_err_with(|| format!("reading {}", reference.display()))?;
                out.report.ber_post = bit_error_ratio(&out.bits, &reference_bits);
            }

            io::write_payload_bits(&output, &out.bits)?;
            let session_report = SessionReport::new(
                params.ppm_order(),
                params.code_rate().to_string(),
                out.bits.len(),
                &out.report,
            );
            session_report.print_summary();
            if let Some(path) = report {
                session_report.write(&path)?;
                println!("report -> {}", path.display());
            }
            if args.verbose {
                eprint!("{}", session.logger());
            }
        }

        Command::Simulate {
            bits,
            seed,
            events,
            report,
        } => {
            let mut rng = StdRng::seed_from_u64(seed);
            let payload: Vec<u8> = (0..bits).map(|_| rng.gen_range(0..=1u8)).collect();

            let bar = progress_bar(3, "simulating");
            let frame = encode(&payload, &params);
            bar.inc(1);

            let channel = PhotonChannelConfig {
                signal_photons: cli_config.channel.signal_photons,
                background_photons: cli_config.channel.background_photons,
                jitter_sigma: cli_config.channel.jitter_sigma,
                clock_skew: cli_config.channel.clock_skew,
                deterministic_signal: false,
            };
            let times = photon_timestamps(&frame.slot_matrix, &channel, &params, &mut rng);
            if let Some(path) = &events {
                io::write_timestamps(path, &times)?;
            }
            bar.inc(1);

            let mut session = DecoderSession::new(params.clone())
                .with_log_config(log_config)
                .with_reference_symbols(frame.symbols.clone());
            let mut out = session.decode_timestamps(&times, Some(0.0))?;
            out.report.ber_post = bit_error_ratio(&out.bits, &payload);
            bar.inc(1);
            bar.finish_and_clear();

            let session_report = SessionReport::new(
                params.ppm_order(),
                params.code_rate().to_string(),
                out.bits.len(),
                &out.report,
            );
            session_report.print_summary();
            if let Some(path) = report {
                session_report.write(&path)?;
                println!("report -> {}", path.display());
            }
            if args.verbose {
                eprint!("{}", session.logger());
            }
        }
    }

    Ok(())
}

fn progress_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static template is valid"),
    );
    spinner.set_message(message);
    spinner
}

fn progress_bar(steps: u64, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(steps);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
            .expect("static template is valid"),
    );
    bar.set_message(message);
    bar
}
