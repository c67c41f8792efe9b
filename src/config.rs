//! TOML configuration loading.

use crate::domain::category::Category;
use crate::error::{CommissionError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub product: ProductConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// RocksDB directory; only honoured with the `storage-rocksdb` feature.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./commishcrunch-data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProductConfig {
    /// Used as the first segment of backup file names.
    #[serde(default = "default_product_name")]
    pub name: String,
    #[serde(default = "default_category")]
    pub default_category: Category,
}

fn default_product_name() -> String {
    "commishcrunch".to_string()
}

fn default_category() -> Category {
    Category::Solar
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: default_product_name(),
            default_category: default_category(),
        }
    }
}

impl Config {
    /// Loads the file at `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CommissionError::Validation(format!("invalid config: {e}")))
    }
}
