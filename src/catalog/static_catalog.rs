//! Catalog served from configuration.

use super::traits::Catalog;
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use async_trait::async_trait;
use tracing::debug;

/// In-process catalog with fixed option lists.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    config: CatalogConfig,
}

impl StaticCatalog {
    /// Create a catalog over the given option lists.
    pub fn new(config: CatalogConfig) -> Self {
        Self { config }
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn list_fiats(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.config.fiats.clone())
    }

    async fn list_exchanges(&self, _fiat: &str) -> Result<Vec<String>, CatalogError> {
        // Exchanges are global
        Ok(self
            .config
            .exchanges
            .iter()
            .map(|entry| entry.name.clone())
            .collect())
    }

    async fn list_banks(&self, fiat: &str, exchange: &str) -> Result<Vec<String>, CatalogError> {
        let banks = self
            .config
            .exchanges
            .iter()
            .find(|entry| entry.name == exchange)
            .map(|entry| entry.banks.clone())
            .unwrap_or_default();

        debug!(fiat, exchange, count = banks.len(), "Listed banks");
        Ok(banks)
    }
}
