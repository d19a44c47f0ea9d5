use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::Error;

/// Settings consumed by the data-access layer: where the database lives and where
/// image files are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,

    pub images: ImageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `sqlite://data/projects.db?mode=rwc`
    pub url: String,

    /// Upper bound of the driver pool
    pub max_connections: u32,

    pub min_connections: u32,

    /// Seconds to wait for a connection before giving up
    pub connect_timeout_secs: u64,

    /// Let sqlx log every statement on its own (the crate already logs at debug)
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            sqlx_logging: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Directory holding the stored image files
    pub directory: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("images"),
        }
    }
}

impl Config {
    /// Parse a TOML document; missing sections and keys fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}
