//! Configuration file support for the BAC tracker.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/bac/config.toml`.

use crate::{Error, Result, Sex, SimulationParameters};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub profile: ProfileConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Body and metabolism settings fed to the simulation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_body_weight_kg")]
    pub body_weight_kg: f64,

    #[serde(default)]
    pub sex: Sex,

    #[serde(default = "default_first_hour_burn_rate")]
    pub first_hour_burn_rate: f64,

    #[serde(default = "default_subsequent_hour_burn_rate")]
    pub subsequent_hour_burn_rate: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            body_weight_kg: default_body_weight_kg(),
            sex: Sex::default(),
            first_hour_burn_rate: default_first_hour_burn_rate(),
            subsequent_hour_burn_rate: default_subsequent_hour_burn_rate(),
        }
    }
}

impl ProfileConfig {
    /// Build simulation parameters, clamping out-of-range values
    pub fn to_parameters(&self) -> SimulationParameters {
        let body_weight_kg = if self.body_weight_kg.is_finite() && self.body_weight_kg >= 1.0 {
            self.body_weight_kg
        } else {
            tracing::warn!(
                "body_weight_kg {} is not a usable weight, using 1kg",
                self.body_weight_kg
            );
            1.0
        };

        SimulationParameters {
            body_weight_kg,
            sex: self.sex,
            first_hour_burn_rate: clamp_burn_rate(
                "first_hour_burn_rate",
                self.first_hour_burn_rate,
                SimulationParameters::MAX_FIRST_HOUR_BURN_RATE,
            ),
            subsequent_hour_burn_rate: clamp_burn_rate(
                "subsequent_hour_burn_rate",
                self.subsequent_hour_burn_rate,
                SimulationParameters::MAX_SUBSEQUENT_HOUR_BURN_RATE,
            ),
        }
    }
}

fn clamp_burn_rate(field: &str, value: f64, max: f64) -> f64 {
    if value.is_nan() {
        tracing::warn!("{} is NaN, using 0", field);
        return 0.0;
    }

    let clamped = value.clamp(0.0, max);
    if clamped != value {
        tracing::warn!("{} {} outside [0, {}], using {}", field, value, max, clamped);
    }
    clamped
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("bac")
}

fn default_body_weight_kg() -> f64 {
    70.0
}

fn default_first_hour_burn_rate() -> f64 {
    2.0
}

fn default_subsequent_hour_burn_rate() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("bac").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn simulation_parameters(&self) -> SimulationParameters {
        self.profile.to_parameters()
    }
}
