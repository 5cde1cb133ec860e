//! Option catalogs for the settings editors.
//!
//! ## Static
//! Serves fiats, exchanges and banks from configuration. Exchanges are
//! global: the same list is offered for every fiat.

mod static_catalog;
mod traits;

pub use static_catalog::StaticCatalog;
pub use traits::Catalog;

#[cfg(test)]
pub use traits::MockCatalog;
