//! Catalog of selectable options.
//!
//! Front ends populate their pickers from a [`Catalog`]:
//! - Fiats available for configuration
//! - Exchanges available for a fiat
//! - Banks available for a (fiat, exchange) pair

use crate::error::CatalogError;
use async_trait::async_trait;

/// Source of the option lists shown by the editors.
///
/// Lookups are read-only. An unknown key yields an empty list, not an error;
/// errors are reserved for an unreachable catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Ordered fiat names.
    async fn list_fiats(&self) -> Result<Vec<String>, CatalogError>;

    /// Ordered exchange names offered for `fiat`.
    async fn list_exchanges(&self, fiat: &str) -> Result<Vec<String>, CatalogError>;

    /// Ordered bank names for `exchange` under `fiat`.
    async fn list_banks(&self, fiat: &str, exchange: &str) -> Result<Vec<String>, CatalogError>;
}
