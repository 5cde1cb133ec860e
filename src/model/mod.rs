//! Settings data model.
//!
//! A [`Fiat`] owns its soups, a soup owns its exchange parsers and a parser
//! owns its two filters, all by value. The whole `Fiat` is the unit of
//! persistence.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Saved settings keyed by fiat name, as stored in the settings blob.
pub type SettingsMap = BTreeMap<String, Fiat>;

/// Amount/price bounds and accepted payment methods for one trade direction.
///
/// Decimal fields are written as plain JSON numbers and read from either
/// numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub min_amount: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub max_amount: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub min_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub max_price: Decimal,
    #[serde(default)]
    pub payment_methods: Vec<String>,
}

impl Filter {
    /// Bound pairs whose minimum exceeds their maximum.
    ///
    /// These are reported, never rejected.
    pub fn bound_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.min_amount > self.max_amount {
            warnings.push(format!(
                "min_amount {} exceeds max_amount {}",
                self.min_amount, self.max_amount
            ));
        }
        if self.min_price > self.max_price {
            warnings.push(format!(
                "min_price {} exceeds max_price {}",
                self.min_price, self.max_price
            ));
        }
        warnings
    }
}

/// Monitoring configuration for one exchange inside a soup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeParser {
    pub exchange_name: String,
    #[serde(default)]
    pub banks: Vec<String>,
    #[serde(default)]
    pub filter_buy: Filter,
    #[serde(default)]
    pub filter_sell: Filter,
}

/// A named bundle of exchange parsers with a target average price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSoup {
    pub name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub average: Decimal,
    pub exchanges: Vec<ExchangeParser>,
}

impl Default for ExchangeSoup {
    /// A fresh soup always carries one blank exchange parser.
    fn default() -> Self {
        Self {
            name: String::new(),
            average: Decimal::ZERO,
            exchanges: vec![ExchangeParser::default()],
        }
    }
}

/// Top-level configuration unit: one fiat and its soups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fiat {
    pub name: String,
    #[serde(default)]
    pub exchange_soups: Vec<ExchangeSoup>,
}

impl Fiat {
    pub fn new(name: impl Into<String>, exchange_soups: Vec<ExchangeSoup>) -> Self {
        Self {
            name: name.into(),
            exchange_soups,
        }
    }
}
