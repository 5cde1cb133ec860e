//! Configuration management for the soup settings editor.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the settings blob lives
    #[serde(default)]
    pub storage: StorageConfig,
    /// Selectable fiats, exchanges and banks
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file (":memory:" for a throwaway store)
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Key the settings blob is stored under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Fiat names, in display order
    #[serde(default = "default_fiats")]
    pub fiats: Vec<String>,
    /// Exchanges and their banks, in display order
    #[serde(default = "default_exchanges")]
    pub exchanges: Vec<ExchangeCatalogEntry>,
}

/// One exchange and the banks selectable for it.
///
/// Kept as a list rather than a map: config keys are case-folded, and
/// exchange names are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeCatalogEntry {
    pub name: String,
    #[serde(default)]
    pub banks: Vec<String>,
}

// Default value functions

fn default_db_path() -> String {
    "data/settings.db".to_string()
}

fn default_storage_key() -> String {
    "fiat_settings".to_string()
}

fn default_fiats() -> Vec<String> {
    ["USD", "EUR", "RUB"].iter().map(|s| s.to_string()).collect()
}

fn default_banks() -> Vec<String> {
    ["Tinkoff", "Sberbank", "Raiffeisen", "Alfa Bank"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exchanges() -> Vec<ExchangeCatalogEntry> {
    ["Binance", "Bybit"]
        .iter()
        .map(|name| ExchangeCatalogEntry {
            name: name.to_string(),
            banks: default_banks(),
        })
        .collect()
}

impl Config {
    /// Load configuration from environment variables and config files.
    ///
    /// `file` names the config file without extension; it may be absent.
    pub fn load(file: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("SOUPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.storage.db_path.trim().is_empty(),
            "storage.db_path must not be empty"
        );

        anyhow::ensure!(
            !self.storage.storage_key.trim().is_empty(),
            "storage.storage_key must not be empty"
        );

        anyhow::ensure!(
            !self.catalog.fiats.is_empty(),
            "catalog.fiats must list at least one fiat"
        );

        let mut seen = HashSet::new();
        for entry in &self.catalog.exchanges {
            anyhow::ensure!(
                seen.insert(entry.name.as_str()),
                "duplicate exchange in catalog: {}",
                entry.name
            );
        }

        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            storage_key: default_storage_key(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fiats: default_fiats(),
            exchanges: default_exchanges(),
        }
    }
}
