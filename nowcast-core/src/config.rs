use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    provider::openmeteo::{FORECAST_BASE_URL, GEOCODING_BASE_URL},
    training::{DEFAULT_N_TREES, DEFAULT_NUM_SAMPLES, DEFAULT_SEED, TrainingOptions},
};

pub const FALLBACK_CITY: &str = "London";
pub const MODEL_FILE_NAME: &str = "weather_model.json";

/// Defaults for `nowcast train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub samples: usize,
    pub seed: u64,
    pub trees: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_NUM_SAMPLES,
            seed: DEFAULT_SEED,
            trees: DEFAULT_N_TREES,
        }
    }
}

impl TrainingConfig {
    pub fn to_options(&self) -> TrainingOptions {
        TrainingOptions {
            num_samples: self.samples,
            seed: self.seed,
            n_trees: self.trees,
            ..TrainingOptions::default()
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_city = "Berlin"
/// model_path = "/srv/nowcast/weather_model.json"
///
/// [training]
/// samples = 20000
/// seed = 42
/// trees = 300
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// City used by `nowcast predict` when none is given.
    pub default_city: Option<String>,

    /// Where the model bundle lives; defaults to the platform data directory.
    pub model_path: Option<PathBuf>,

    /// Override for the Open-Meteo geocoding host.
    pub geocoding_url: Option<String>,

    /// Override for the Open-Meteo forecast host.
    pub forecast_url: Option<String>,

    pub training: TrainingConfig,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "nowcast", "nowcast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Model bundle location: the configured path, else the platform data directory.
    pub fn resolved_model_path(&self) -> Result<PathBuf> {
        match &self.model_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join(MODEL_FILE_NAME)),
        }
    }

    /// City to use when none is given on the command line.
    pub fn default_city(&self) -> &str {
        self.default_city
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(FALLBACK_CITY)
    }

    pub fn geocoding_url(&self) -> &str {
        self.geocoding_url.as_deref().unwrap_or(GEOCODING_BASE_URL)
    }

    pub fn forecast_url(&self) -> &str {
        self.forecast_url.as_deref().unwrap_or(FORECAST_BASE_URL)
    }
}
