//! Console configuration: log filter and the starting mix

use std::path::PathBuf;

use dubmix_core::params::{BAND_GAIN, EQ_BAND_COUNT};
use dubmix_core::{DelayParams, FrequencyBand, SirenParams};
use serde::{Deserialize, Serialize};

const DEFAULT_LOG_FILTER: &str = "dubmix=info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// `tracing` directive used when `RUST_LOG` is unset
    pub log_filter: String,
    pub bands: BandGains,
    /// Graphic EQ gains in dB, lowest band first
    pub eq_db: Vec<f32>,
    pub siren: SirenParams,
    pub delay: DelayParams,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            bands: BandGains::default(),
            eq_db: vec![0.0; EQ_BAND_COUNT],
            siren: SirenParams::default(),
            delay: DelayParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandGains {
    pub sub: f32,
    pub bass: f32,
    pub mid: f32,
    pub high: f32,
    pub tweet: f32,
}

impl Default for BandGains {
    fn default() -> Self {
        Self {
            sub: BAND_GAIN.default,
            bass: BAND_GAIN.default,
            mid: BAND_GAIN.default,
            high: BAND_GAIN.default,
            tweet: BAND_GAIN.default,
        }
    }
}

impl BandGains {
    pub fn get(&self, band: FrequencyBand) -> f32 {
        match band {
            FrequencyBand::Sub => self.sub,
            FrequencyBand::Bass => self.bass,
            FrequencyBand::Mid => self.mid,
            FrequencyBand::High => self.high,
            FrequencyBand::Tweet => self.tweet,
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dubmix")
        .join("config.toml")
}

/// Read the config file, falling back to defaults when it is missing or
/// malformed
pub fn load_config() -> ConsoleConfig {
    std::fs::read_to_string(config_path())
        .ok()
        .and_then(|s| parse_config(&s))
        .unwrap_or_default()
}

fn parse_config(text: &str) -> Option<ConsoleConfig> {
    toml::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use dubmix_core::SirenMode;

    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse_config(""), Some(ConsoleConfig::default()));
    }

    #[test]
    fn test_partial_config() {
        let text = r#"
log_filter = "dubmix=debug"
eq_db = [3.0, 1.5]

[bands]
sub = 0.8
tweet = 0.1

[siren]
mode = "alarm"

[delay]
feedback = 0.6
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.log_filter, "dubmix=debug");
        assert_eq!(config.bands.get(FrequencyBand::Sub), 0.8);
        assert_eq!(config.bands.get(FrequencyBand::Bass), 0.5);
        assert_eq!(config.bands.get(FrequencyBand::Tweet), 0.1);
        assert_eq!(config.eq_db, vec![3.0, 1.5]);
        assert_eq!(config.siren.mode, SirenMode::Alarm);
        assert_eq!(config.siren.frequency_hz, 440.0);
        assert_eq!(config.delay.feedback, 0.6);
        assert_eq!(config.delay.time_secs, 0.3);
    }

    #[test]
    fn test_malformed_config_rejected() {
        assert_eq!(parse_config("bands = 3"), None);
    }
}
