/// TOML configuration with sensible defaults.
/// No config file is required to run; defaults work out of the box.

use crate::controller::ControllerSettings;
use crate::mapper::Capabilities;
use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler tick period
    pub poll_interval_ms: u64,
    /// false for single-motor devices (channel 1 always 0)
    pub dual_actuator: bool,
    /// Give infinite effects this much run time once they start (unset = run until stopped)
    pub infinite_cap_ms: Option<u64>,
    pub hid: HidConfig,
    /// Pulses played on every bound device at startup
    pub test_pattern: Vec<Pulse>,
}

/// Device discovery filter. Zero VID/PID match any device.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HidConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
}

/// Which motor(s) a pulse drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Small,
    Big,
    Both,
}

/// One constant-force pulse of the test pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pulse {
    /// 0..10000
    pub magnitude: i32,
    #[serde(default)]
    pub delay_ms: u64,
    pub duration_ms: u64,
    #[serde(default = "default_channel")]
    pub channel: Channel,
}

fn default_channel() -> Channel {
    Channel::Both
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: crate::scheduler::POLL_INTERVAL_MS,
            dual_actuator: true,
            infinite_cap_ms: None,
            hid: HidConfig::default(),
            test_pattern: vec![
                Pulse { magnitude: 7000, delay_ms: 0, duration_ms: 120, channel: Channel::Small },
                // pause
                Pulse { magnitude: 0, delay_ms: 0, duration_ms: 100, channel: Channel::Both },
                Pulse { magnitude: 7000, delay_ms: 0, duration_ms: 120, channel: Channel::Big },
            ],
        }
    }
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0,
            product_id: 0,
            usage_page: 0x01, // Generic Desktop
            usage: 0x05,      // Game Pad
        }
    }
}

impl Config {
    /// Load config from the default config file path, or return defaults if not found.
    pub fn load() -> Self {
        let config_path = config_file_path();
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {config_path}");
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {config_path}: {e}. Using defaults.");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {config_path}. Using defaults.");
                Self::default()
            }
        }
    }

    /// Controller tunables derived from this config.
    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            capabilities: Capabilities { dual_actuator: self.dual_actuator },
            infinite_cap_ms: self.infinite_cap_ms,
        }
    }
}

fn config_file_path() -> String {
    if let Ok(path) = std::env::var("FFBVIB_CONFIG") {
        path
    } else if let Ok(appdata) = std::env::var("APPDATA") {
        format!("{appdata}\\ffbvib\\config.toml")
    } else {
        "ffbvib.toml".into()
    }
}
