//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the tide-config.toml file.
//! It covers the NOAA station and sun location, chart geometry, button timing and
//! the e-paper wiring. Every section has defaults, so a partial file only needs to
//! name what it changes.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "tide-config.toml";

/// Application configuration loaded from tide-config.toml
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Tide station and sun location
    pub station: StationConfig,
    /// Chart canvas and layout
    pub display: DisplayConfig,
    /// Day navigation buttons
    pub buttons: ButtonConfig,
    /// E-paper wiring (only used with the `hardware` feature)
    pub hardware: HardwareConfig,
}

/// NOAA tide station and sunrise/sunset location
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// NOAA station ID (e.g., "9449988" for Friday Harbor, WA)
    pub id: String,
    /// Human-readable station name for reference
    pub name: String,
    /// Latitude passed to the sunrise/sunset service
    pub latitude: f64,
    /// Longitude passed to the sunrise/sunset service
    pub longitude: f64,
    /// IANA zone the sun times are reported in; should match the station's local time
    pub time_zone: String,
    /// NOAA datum for the height predictions
    pub datum: String,
    /// Application name NOAA asks callers to identify with
    pub application: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

/// Chart geometry, in pixels unless noted
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Canvas width (panel in landscape)
    pub width: u32,
    /// Canvas height
    pub height: u32,
    /// Left margin before the first sample
    pub x_buffer: i32,
    /// Gap between the zero-offset baseline and the bottom edge
    pub y_buffer: i32,
    /// Horizontal span of the tide curve
    pub plot_width: u32,
    /// Vertical span of the tide curve
    pub band_height: f32,
    /// Tide samples per day (240 at NOAA's 6-minute cadence)
    pub sample_count: usize,
    /// Sunrise/sunset ring radius
    pub sun_radius: u32,
}

/// Day navigation buttons
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// Pause after a press before polling again
    pub debounce_ms: u64,
    /// Idle polling interval
    pub poll_ms: u64,
    /// Wait before fetching a day again after it failed
    pub retry_ms: u64,
}

/// E-paper and button wiring (BCM GPIO numbers)
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub spi_device: String,
    pub gpio_chip: String,
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub busy_pin: u32,
    /// "Next day" button, active low
    pub next_pin: u32,
    /// "Previous day" button, active low
    pub previous_pin: u32,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            id: "9449988".to_string(),
            name: "Friday Harbor, WA".to_string(),
            latitude: 48.5343,
            longitude: -123.0171,
            time_zone: "America/Los_Angeles".to_string(),
            datum: "STND".to_string(),
            application: "tide_chart".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: 250, // 2.13" panel rotated to landscape
            height: 122,
            x_buffer: 10,
            y_buffer: 30,
            plot_width: 240,
            band_height: 60.0,
            sample_count: 240,
            sun_radius: 5,
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        ButtonConfig {
            debounce_ms: 300,
            poll_ms: 50,
            retry_ms: 60_000,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            spi_device: "/dev/spidev0.0".to_string(),
            gpio_chip: "/dev/gpiochip0".to_string(),
            dc_pin: 22,
            rst_pin: 27,
            busy_pin: 17,
            next_pin: 6,
            previous_pin: 5,
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!("Loaded configuration for station: {}", config.station.name);
                    config
                }
                Err(e) => {
                    warn!("Invalid config file format: {}", e);
                    warn!("Using default configuration (Friday Harbor, WA)");
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found, using default configuration (Friday Harbor, WA)");
                Self::default()
            }
        }
    }

    /// Save configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.station.id, "9449988");
        assert_eq!(config.station.name, "Friday Harbor, WA");
        assert_eq!(config.display.width, 250);
        assert_eq!(config.display.height, 122);
        assert_eq!(config.display.sample_count, 240);
        assert_eq!(config.buttons.debounce_ms, 300);
        assert_eq!(config.buttons.retry_ms, 60_000);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.station.id, parsed.station.id);
        assert_eq!(config.display.plot_width, parsed.display.plot_width);
        assert_eq!(config.hardware.busy_pin, parsed.hardware.busy_pin);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"
[station]
id = "9447130"
name = "Seattle, WA"

[buttons]
debounce_ms = 150
"#,
        )
        .unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.station.id, "9447130");
        assert_eq!(config.station.time_zone, "America/Los_Angeles");
        assert_eq!(config.buttons.debounce_ms, 150);
        assert_eq!(config.buttons.poll_ms, 50);
        assert_eq!(config.display.width, 250);
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.station.name = "Anacortes, WA".to_string();
        config.save_to_path(file.path()).unwrap();

        let loaded = Config::load_from_path(file.path());
        assert_eq!(loaded.station.name, "Anacortes, WA");
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[display]\nwidth = \"wide\"\n").unwrap();
        let config = Config::load_from_path(file.path());
        assert_eq!(config.display.width, 250);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.station.id, "9449988");
    }
}
