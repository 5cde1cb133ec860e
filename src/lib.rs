//! # Soup Settings
//!
//! Configuration editor for fiat exchange-monitoring rules. Each fiat owns
//! named "soups"; a soup bundles a target average price with per-exchange
//! parsers (bank selection plus buy/sell price and amount filters).
//!
//! ## Architecture
//!
//! - `model`: Filter, ExchangeParser, ExchangeSoup and Fiat
//! - `editor`: Nested editors and the root controller
//! - `catalog`: Selectable fiats, exchanges and banks
//! - `persistence`: SQLite-backed settings blob
//! - `config`: Configuration management and validation
//! - `error`: Error types

pub mod catalog;
pub mod config;
pub mod editor;
pub mod error;
pub mod model;
pub mod persistence;

pub use config::Config;
pub use error::{CatalogError, EditorError, StoreError};
