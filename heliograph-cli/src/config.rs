//! CLI configuration: a TOML file wrapping the core session options.

use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use heliograph_core::config::SessionConfig;
use heliograph_core::llr::ChannelRates;

/// Complete CLI configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct CliConfig {
    /// Core session options
    pub session: SessionConfig,

    /// Channel simulation settings for `simulate`
    pub channel: ChannelSection,

    /// Fixed decoder channel rates; estimated from CSM regions when absent
    pub rates: Option<RatesSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ChannelSection {
    pub signal_photons: f64,
    pub background_photons: f64,
    pub jitter_sigma: f64,
    pub clock_skew: f64,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            signal_photons: 3.0,
            background_photons: 0.01,
            jitter_sigma: 0.02,
            clock_skew: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatesSection {
    pub signal: f64,
    pub background: f64,
}

impl From<RatesSection> for ChannelRates {
    fn from(value: RatesSection) -> Self {
        ChannelRates {
            signal: value.signal,
            background: value.background,
        }
    }
}

impl CliConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).wrap_err_with(|| format!("parsing {}", path.display()))
    }
}
