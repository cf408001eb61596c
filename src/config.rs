//! Configuration loading for MargaNav

use std::path::Path;

use serde::Deserialize;

use crate::core::types::Waypoint;
use crate::error::{Error, Result};
use crate::sequencer::{DEFAULT_THRESHOLD, SequencerConfig};
use crate::streaming::wire::WireFormat;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sequencer: SequencerSection,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub startup: StartupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Waypoint list and arrival settings
#[derive(Clone, Debug, Deserialize)]
pub struct SequencerSection {
    /// Initial waypoints as `[x, y, altitude]` or `[x, y, altitude, yaw]`
    #[serde(default)]
    pub waypoints: Option<Vec<Vec<f64>>>,

    /// Arrival distance in meters (default: 5.0)
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Wrap to the first waypoint after the last (default: true)
    #[serde(default = "default_cycle")]
    pub cycle: bool,
}

/// Socket addresses and payload encoding
#[derive(Clone, Debug, Deserialize)]
pub struct NetworkConfig {
    /// TCP address for waypoint requests (default: 0.0.0.0:5600)
    #[serde(default = "default_command_address")]
    pub command_address: String,

    /// UDP address for vehicle state samples (default: 0.0.0.0:5601)
    #[serde(default = "default_state_address")]
    pub state_address: String,

    /// TCP address for latched telemetry (default: 0.0.0.0:5602)
    #[serde(default = "default_publish_address")]
    pub publish_address: String,

    /// Payload encoding shared by every socket (default: json)
    #[serde(default)]
    pub wire_format: WireFormat,
}

/// Startup sequencing
#[derive(Clone, Debug, Deserialize)]
pub struct StartupConfig {
    /// Delay after process start before the sequencer comes up (default: 2000)
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
}

/// Log output
#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_cycle() -> bool {
    true
}
fn default_command_address() -> String {
    "0.0.0.0:5600".to_string()
}
fn default_state_address() -> String {
    "0.0.0.0:5601".to_string()
}
fn default_publish_address() -> String {
    "0.0.0.0:5602".to_string()
}
fn default_warmup_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SequencerSection {
    fn default() -> Self {
        Self {
            waypoints: None,
            threshold: default_threshold(),
            cycle: default_cycle(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            command_address: default_command_address(),
            state_address: default_state_address(),
            publish_address: default_publish_address(),
            wire_format: WireFormat::default(),
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            warmup_ms: default_warmup_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.sequencer.threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::Config(format!(
                "sequencer.threshold must be a non-negative number, got {}",
                threshold
            )));
        }
        Ok(())
    }

    /// Build the sequencer configuration from the `[sequencer]` section.
    ///
    /// A missing or empty waypoint list is `MissingInitialWaypoints`; an entry
    /// without 3 or 4 components is `InvalidWaypoint`.
    pub fn sequencer_config(&self) -> Result<SequencerConfig> {
        let raw = match &self.sequencer.waypoints {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Err(Error::MissingInitialWaypoints),
        };

        let waypoints = raw
            .iter()
            .enumerate()
            .map(|(i, components)| {
                Waypoint::from_components(components).map_err(|e| match e {
                    Error::InvalidWaypoint(msg) => {
                        Error::InvalidWaypoint(format!("waypoint {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SequencerConfig::new(waypoints)
            .with_threshold(self.sequencer.threshold)
            .with_cyclical(self.sequencer.cycle))
    }
}
