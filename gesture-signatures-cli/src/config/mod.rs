use anyhow::{Context, Result};
use gesture_signatures::config::{OptimizerConfig, TrainerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub trainer: TrainerConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where trained signatures are written and read for optimization
    #[serde(default = "default_gestures_dir")]
    pub gestures_dir: PathBuf,

    #[serde(default = "default_optimized_dir")]
    pub optimized_dir: PathBuf,
}

// Default value functions
fn default_gestures_dir() -> PathBuf {
    PathBuf::from("gestures")
}

fn default_optimized_dir() -> PathBuf {
    PathBuf::from("gestures_optimized")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            gestures_dir: default_gestures_dir(),
            optimized_dir: default_optimized_dir(),
        }
    }
}

impl Config {
    /// Get config directory path (~/.gesture-signatures/)
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".gesture-signatures"))
    }

    /// Get config file path (~/.gesture-signatures/config.toml)
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Resolve an explicit path or fall back to the default location
    pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::config_file(),
        }
    }

    /// Load configuration from file, using defaults when it does not exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_file = Self::resolve_path(path)?;

        if !config_file.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", config_file);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_file)
            .with_context(|| format!("Failed to read config file {:?}", config_file))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", config_file))?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {:?}", config_file);

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_file = Self::resolve_path(path)?;
        if let Some(parent) = config_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_file, contents).context("Failed to write config file")?;

        Ok(config_file)
    }

    pub fn validate(&self) -> Result<()> {
        self.trainer
            .validate()
            .context("Invalid [trainer] configuration")?;
        self.optimizer
            .validate()
            .context("Invalid [optimizer] configuration")?;
        Ok(())
    }
}
