//! Configuration file parsing.
//!
//! Every section and field is optional; a missing config file means defaults.
//!
//! ```toml
//! [pricing]
//! risk_free_rate = 0.03
//!
//! [database]
//! path = "data/options.db"
//!
//! [provider]
//! base_url = "https://query2.finance.yahoo.com"
//! cookie_url = "https://fc.yahoo.com"
//! user_agent = "Mozilla/5.0"
//! timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::DEFAULT_RISK_FREE_RATE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Annualized, continuously compounded
    pub risk_free_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/options.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Visited once to obtain the session cookie the crumb endpoint requires
    pub cookie_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com".to_string(),
            cookie_url: "https://fc.yahoo.com".to_string(),
            user_agent: "Mozilla/5.0 (compatible; options-etl)".to_string(),
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Parse from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides and re-validate the result.
    pub fn with_overrides(
        mut self,
        risk_free_rate: Option<f64>,
        database_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(rate) = risk_free_rate {
            self.pricing.risk_free_rate = rate;
        }
        if let Some(path) = database_path {
            self.database.path = path;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pricing.risk_free_rate.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "pricing.risk_free_rate must be finite, got {}",
                self.pricing.risk_free_rate
            )));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "provider.timeout_secs must be positive".to_string(),
            ));
        }
        if self.provider.base_url.is_empty() {
            return Err(ConfigError::Invalid(
                "provider.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
