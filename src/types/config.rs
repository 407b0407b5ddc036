//! Network definition and CLI configuration
//!
//! The simulator is driven by a JSON network definition: carriers with their
//! office locations, monitored products with tolerance thresholds, and the
//! compliance-monitoring knobs. Validation is fatal at bootstrap — a
//! malformed network never produces a partially started simulator.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Per-office row of the network definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeConfig {
    /// Whether this office is the carrier's hub
    #[serde(rename = "hub", default)]
    pub is_hub: bool,

    /// Human-readable location, with a trailing ", STATE" token
    #[serde(default)]
    pub description: String,

    /// GMT offset in `±HH:MM` form; a missing sign is normalized to `+`
    #[serde(rename = "gmtOffset", default)]
    pub gmt_offset: String,

    /// Office latitude in decimal degrees
    pub latitude: f64,

    /// Office longitude in decimal degrees
    pub longitude: f64,
}

/// Per-carrier row of the network definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// Human-readable carrier description
    #[serde(default)]
    pub description: String,

    /// Offices keyed by IATA code
    pub offices: BTreeMap<String, OfficeConfig>,
}

/// Environmental tolerance band for a monitored product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Handling code of the item type (`P` perishable, `D` dry ice)
    #[serde(rename = "handlingCd")]
    pub item_type: String,

    /// Minimum tolerated value
    #[serde(rename = "minValue")]
    pub min_value: f64,

    /// Maximum tolerated value
    #[serde(rename = "maxValue")]
    pub max_value: f64,

    /// Unit of measure; defaulted by item type when absent
    #[serde(default)]
    pub uom: String,
}

/// Compliance-monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Whether events are posted to the compliance sink
    #[serde(default)]
    pub enabled: bool,

    /// Probability of injecting a violation sub-period per monitoring window
    #[serde(rename = "violationRate", default)]
    pub violation_rate: f64,

    /// Event type name posted on package pickup
    #[serde(default = "default_pickup_event")]
    pub pickup: String,

    /// Event type name posted on inter-carrier transfer
    #[serde(default = "default_transfer_event")]
    pub transfer: String,

    /// Event type name posted on transfer acknowledgment
    #[serde(rename = "transferAck", default = "default_transfer_ack_event")]
    pub transfer_ack: String,

    /// Event type name posted on package delivery
    #[serde(rename = "deliver", default = "default_delivery_event")]
    pub delivery: String,

    /// Event type name posted for temperature violations
    #[serde(rename = "updateTemperature", default = "default_temperature_event")]
    pub update_temperature: String,
}

fn default_pickup_event() -> String {
    "pickup".to_string()
}

fn default_transfer_event() -> String {
    "transfer".to_string()
}

fn default_transfer_ack_event() -> String {
    "transferAck".to_string()
}

fn default_delivery_event() -> String {
    "deliver".to_string()
}

fn default_temperature_event() -> String {
    "updateTemperature".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            violation_rate: 0.0,
            pickup: default_pickup_event(),
            transfer: default_transfer_event(),
            transfer_ack: default_transfer_ack_event(),
            delivery: default_delivery_event(),
            update_temperature: default_temperature_event(),
        }
    }
}

/// Complete network definition, as loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Carriers keyed by name
    pub carriers: BTreeMap<String, CarrierConfig>,

    /// Monitored products keyed by product name
    #[serde(default)]
    pub products: BTreeMap<String, ThresholdConfig>,

    /// Compliance-monitoring configuration
    #[serde(rename = "monitoring", default)]
    pub monitor: MonitorConfig,

    /// Random seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Network definition file not found
    #[error("network definition not found: {0}")]
    FileNotFound(String),

    /// Network definition file read error
    #[error("failed to read network definition: {0}")]
    Read(#[from] std::io::Error),

    /// JSON parsing error
    #[error("failed to parse network definition: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error(transparent)]
    Invalid(#[from] ConfigValidationError),
}

/// Validation errors for the network definition
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// No carriers defined
    #[error("network must define at least one carrier")]
    NoCarriers,

    /// Carrier has no offices
    #[error("carrier {0} has no offices")]
    NoOffices(String),

    /// Carrier does not have exactly one hub office
    #[error("carrier {carrier} must designate exactly one hub office, found {count}")]
    HubCount {
        /// Carrier name
        carrier: String,
        /// Number of offices flagged as hub
        count: usize,
    },

    /// Threshold band is inverted or degenerate
    #[error("threshold for {product} has min {min} >= max {max}")]
    InvalidThreshold {
        /// Product name
        product: String,
        /// Configured minimum
        min: f64,
        /// Configured maximum
        max: f64,
    },

    /// Violation rate outside the unit interval
    #[error("violation rate must be between 0.0 and 1.0, got {0}")]
    InvalidViolationRate(f64),
}

impl NetworkConfig {
    /// Load a network definition from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let config: NetworkConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the network definition
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.carriers.is_empty() {
            return Err(ConfigValidationError::NoCarriers);
        }
        for (name, carrier) in &self.carriers {
            if carrier.offices.is_empty() {
                return Err(ConfigValidationError::NoOffices(name.clone()));
            }
            let hubs = carrier.offices.values().filter(|o| o.is_hub).count();
            if hubs != 1 {
                return Err(ConfigValidationError::HubCount { carrier: name.clone(), count: hubs });
            }
        }
        for (product, threshold) in &self.products {
            if threshold.min_value >= threshold.max_value {
                return Err(ConfigValidationError::InvalidThreshold {
                    product: product.clone(),
                    min: threshold.min_value,
                    max: threshold.max_value,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.monitor.violation_rate) {
            return Err(ConfigValidationError::InvalidViolationRate(self.monitor.violation_rate));
        }
        Ok(())
    }
}

/// Command line arguments
#[derive(Debug, Clone, Parser)]
#[command(
    name = "coldchain-simulator",
    version,
    about = "Cold-chain logistics network and package transit simulator",
    long_about = "Builds a multi-carrier hub-and-spoke shipping network from a JSON \
definition, persists it to an in-memory graph store, and simulates the full \
transit lifecycle of packages, including randomized temperature-compliance \
monitoring of refrigerated containers."
)]
pub struct CliArgs {
    /// Network definition file (JSON)
    #[arg(short, long, help = "Network definition file (JSON)")]
    pub config: String,

    /// Random seed for reproducible runs
    #[arg(long, help = "Random seed for reproducible runs")]
    pub seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// What to simulate
    #[command(subcommand)]
    pub command: Command,
}

/// Simulator subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Validate the network definition and print a summary
    Check,
    /// Create a shipping label from a label request file and run a pickup
    Ship {
        /// Label request file (JSON)
        #[arg(short, long)]
        request: String,
        /// Print the package transit timeline after delivery
        #[arg(long)]
        timeline: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn sample_config() -> NetworkConfig {
        let json = r#"{
            "carriers": {
                "NLS": {
                    "description": "Northern Logistics",
                    "offices": {
                        "DEN": {
                            "hub": true,
                            "description": "Denver, CO",
                            "gmtOffset": "-07:00",
                            "latitude": 39.7392,
                            "longitude": -104.9903
                        },
                        "JFK": {
                            "description": "New York, NY",
                            "gmtOffset": "-05:00",
                            "latitude": 40.7128,
                            "longitude": -74.0060
                        }
                    }
                }
            },
            "products": {
                "RnaVaccine": { "handlingCd": "P", "minValue": -80.0, "maxValue": -60.0 }
            },
            "monitoring": { "enabled": false, "violationRate": 0.1 }
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_sample_config_parses_and_validates() {
        let config = sample_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.carriers.len(), 1);
        let carrier = &config.carriers["NLS"];
        assert!(carrier.offices["DEN"].is_hub);
        assert!(!carrier.offices["JFK"].is_hub);
        assert_eq!(config.products["RnaVaccine"].item_type, "P");
        assert_eq!(config.monitor.violation_rate, 0.1);
    }

    #[test]
    fn test_monitor_event_names_default() {
        let config = sample_config();
        assert_eq!(config.monitor.pickup, "pickup");
        assert_eq!(config.monitor.transfer_ack, "transferAck");
        assert_eq!(config.monitor.delivery, "deliver");
        assert_eq!(config.monitor.update_temperature, "updateTemperature");
    }

    #[test]
    fn test_validation_requires_single_hub() {
        let mut config = sample_config();
        config.carriers.get_mut("NLS").unwrap().offices.get_mut("JFK").unwrap().is_hub = true;
        match config.validate() {
            Err(ConfigValidationError::HubCount { carrier, count }) => {
                assert_eq!(carrier, "NLS");
                assert_eq!(count, 2);
            }
            other => panic!("expected HubCount error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_empty_network() {
        let config = NetworkConfig {
            carriers: BTreeMap::new(),
            products: BTreeMap::new(),
            monitor: MonitorConfig::default(),
            seed: None,
        };
        assert!(matches!(config.validate(), Err(ConfigValidationError::NoCarriers)));
    }

    #[test]
    fn test_validation_rejects_inverted_threshold() {
        let mut config = sample_config();
        config.products.get_mut("RnaVaccine").unwrap().min_value = -50.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_bad_violation_rate() {
        let mut config = sample_config();
        config.monitor.violation_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidViolationRate(_))
        ));
    }

    #[test]
    fn test_config_file_loading() {
        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        let json = serde_json::to_string(&sample_config()).unwrap();
        temp_file.write_all(json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = NetworkConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.carriers.len(), 1);
        assert!(config.carriers["NLS"].offices["DEN"].is_hub);
    }

    #[test]
    fn test_config_file_not_found() {
        let result = NetworkConfig::from_file("/nonexistent/network.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
