//! Tester settings
//!
//! Defaults match the classic behavior of the tool; a JSON file can override
//! any subset of them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::meter::DEFAULT_BAR_WIDTH;
use crate::error::{Result, TesterError};

const CONFIG_DIR: &str = "headphone-tester";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    /// Frames per level-meter block
    pub meter_block_size: u32,
    /// Frames per loopback block, small for low latency
    pub loopback_block_size: u32,
    /// Width of the meter bar in glyphs
    pub bar_width: usize,
    /// Sleep between polls while a stream runs
    pub poll_interval_ms: u64,
    pub tone_frequency: f64,
    pub tone_seconds: f64,
    pub channel_test_frequency: f64,
    pub channel_test_seconds: f64,
    pub sweep_seconds: f64,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            meter_block_size: 1024,
            loopback_block_size: 256,
            bar_width: DEFAULT_BAR_WIDTH,
            poll_interval_ms: 50,
            tone_frequency: 440.0,
            tone_seconds: 2.0,
            channel_test_frequency: 440.0,
            channel_test_seconds: 2.0,
            sweep_seconds: 5.0,
        }
    }
}

impl TesterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| TesterError::invalid(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings.
    ///
    /// An explicit path must exist. Without one the per-user config file is
    /// read when present, otherwise defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        log::info!("Loading config from {}", path.display());
        let text = fs::read_to_string(&path).map_err(|e| {
            TesterError::invalid(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.meter_block_size == 0 || self.loopback_block_size == 0 {
            return Err(TesterError::invalid("block sizes must be positive"));
        }
        if self.bar_width == 0 {
            return Err(TesterError::invalid("bar_width must be positive"));
        }
        for (name, value) in [
            ("tone_frequency", self.tone_frequency),
            ("tone_seconds", self.tone_seconds),
            ("channel_test_frequency", self.channel_test_frequency),
            ("channel_test_seconds", self.channel_test_seconds),
            ("sweep_seconds", self.sweep_seconds),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(TesterError::invalid(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }
}

/// `<config dir>/headphone-tester/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TesterConfig::default();
        assert_eq!(config.meter_block_size, 1024);
        assert_eq!(config.loopback_block_size, 256);
        assert_eq!(config.bar_width, 50);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TesterConfig::from_json_str(r#"{ "bar_width": 30, "sweep_seconds": 8.0 }"#).unwrap();
        assert_eq!(config.bar_width, 30);
        assert_eq!(config.sweep_seconds, 8.0);
        assert_eq!(config.tone_frequency, 440.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(TesterConfig::from_json_str(r#"{ "bar_width": 0 }"#).is_err());
        assert!(TesterConfig::from_json_str(r#"{ "tone_seconds": -1.0 }"#).is_err());
        assert!(TesterConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        let missing = Path::new("/nonexistent/headphone-tester/config.json");
        assert!(TesterConfig::load(Some(missing)).is_err());
    }
}
