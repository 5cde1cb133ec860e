//! Editor for one exchange parser: bank selection plus buy/sell filters.
//!
//! The sell filter either mirrors the buy filter (default) or is edited on
//! its own. Bank options are fetched asynchronously from the catalog; each
//! fetch is tagged with a generation so that a slow, superseded response can
//! never overwrite the options of a newer exchange selection.

use super::filter::FilterEditor;
use super::notice::{Mode, Notice, ValidationIssue};
use crate::catalog::Catalog;
use crate::error::{CatalogError, EditorError};
use crate::model::{ExchangeParser, Filter};
use tracing::{debug, warn};

/// A pending bank-options fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankRequest {
    pub generation: u64,
    pub fiat: String,
    pub exchange: String,
}

/// Outcome of applying a bank-options response.
#[derive(Debug, Clone, PartialEq)]
pub enum BankFetch {
    /// Options replaced; carries the option count
    Applied(usize),
    /// Response belonged to a superseded request and was dropped
    Stale,
    /// Catalog failed; options fell back to empty
    Failed(Notice),
}

#[derive(Debug, Clone)]
pub struct ExchangeParserEditor {
    fiat: String,
    parser: ExchangeParser,
    mode: Mode,
    mirror: bool,
    bank_options: Vec<String>,
    bank_generation: u64,
}

impl ExchangeParserEditor {
    /// Start from `initial`, or a blank parser.
    ///
    /// Mirroring starts on whenever the two filters already agree, which
    /// includes every blank parser.
    pub fn new(fiat: impl Into<String>, initial: Option<ExchangeParser>, mode: Mode) -> Self {
        let parser = initial.unwrap_or_default();
        let mirror = parser.filter_buy == parser.filter_sell;
        Self {
            fiat: fiat.into(),
            parser,
            mode,
            mirror,
            bank_options: Vec::new(),
            bank_generation: 0,
        }
    }

    pub fn value(&self) -> &ExchangeParser {
        &self.parser
    }

    pub fn fiat(&self) -> &str {
        &self.fiat
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_mirroring(&self) -> bool {
        self.mirror
    }

    pub fn bank_options(&self) -> &[String] {
        &self.bank_options
    }

    /// Switch between view and edit. Values and the mirror flag are kept.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.mode = self.mode.toggled();
        self.mode
    }

    /// Panel title: the exchange name, or `Exchange <position>` (1-based).
    pub fn display_name(&self, position: usize) -> String {
        if self.parser.exchange_name.is_empty() {
            format!("Exchange {position}")
        } else {
            self.parser.exchange_name.clone()
        }
    }

    /// Point the parser at another exchange.
    ///
    /// Selected banks and cached bank options belong to the old exchange and
    /// are cleared; any fetch still in flight becomes stale.
    pub fn select_exchange(
        &mut self,
        exchange: impl Into<String>,
    ) -> Result<ExchangeParser, EditorError> {
        self.ensure_editable()?;

        let exchange = exchange.into();
        if exchange != self.parser.exchange_name {
            debug!(from = %self.parser.exchange_name, to = %exchange, "Exchange selected");
            self.parser.exchange_name = exchange;
            self.parser.banks.clear();
            self.bank_options.clear();
            self.bank_generation += 1;
        }
        Ok(self.parser.clone())
    }

    /// Replace the selected banks. Every bank must be one of the loaded options.
    pub fn set_banks<I, S>(&mut self, banks: I) -> Result<ExchangeParser, EditorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_editable()?;

        let mut selected: Vec<String> = Vec::new();
        for bank in banks {
            let bank: String = bank.into();
            if !self.bank_options.contains(&bank) {
                return Err(EditorError::UnknownOption {
                    kind: "bank",
                    value: bank,
                });
            }
            if !selected.contains(&bank) {
                selected.push(bank);
            }
        }

        self.parser.banks = selected;
        Ok(self.parser.clone())
    }

    /// Run `edit` against the buy filter and propagate the result.
    pub fn edit_buy_filter<F>(&mut self, edit: F) -> Result<ExchangeParser, EditorError>
    where
        F: FnOnce(&mut FilterEditor) -> Result<Filter, EditorError>,
    {
        let mut editor = FilterEditor::new(Some(self.parser.filter_buy.clone()), self.mode);
        let filter = edit(&mut editor)?;
        Ok(self.on_buy_filter_change(filter))
    }

    /// Run `edit` against the sell filter. Rejected while mirroring.
    pub fn edit_sell_filter<F>(&mut self, edit: F) -> Result<ExchangeParser, EditorError>
    where
        F: FnOnce(&mut FilterEditor) -> Result<Filter, EditorError>,
    {
        if self.mirror {
            return Err(EditorError::SellFilterMirrored);
        }
        let mut editor = FilterEditor::new(Some(self.parser.filter_sell.clone()), self.mode);
        self.parser.filter_sell = edit(&mut editor)?;
        Ok(self.parser.clone())
    }

    /// Apply a buy filter emitted by the child editor.
    fn on_buy_filter_change(&mut self, filter: Filter) -> ExchangeParser {
        if self.mirror {
            self.parser.filter_sell = filter.clone();
        }
        self.parser.filter_buy = filter;
        self.parser.clone()
    }

    /// Toggle "use same settings for sell filter".
    ///
    /// Turning it on copies the buy filter into the sell filter at once;
    /// turning it off leaves the sell filter at its last mirrored value.
    pub fn set_mirror(&mut self, mirror: bool) -> Result<ExchangeParser, EditorError> {
        self.ensure_editable()?;
        self.mirror = mirror;
        if mirror {
            self.parser.filter_sell = self.parser.filter_buy.clone();
        }
        debug!(mirror, exchange = %self.parser.exchange_name, "Sell filter mirroring changed");
        Ok(self.parser.clone())
    }

    /// Start a bank-options fetch for the current exchange.
    ///
    /// Returns `None` when no exchange is selected.
    pub fn request_banks(&mut self) -> Option<BankRequest> {
        if self.parser.exchange_name.is_empty() {
            return None;
        }
        self.bank_generation += 1;
        Some(BankRequest {
            generation: self.bank_generation,
            fiat: self.fiat.clone(),
            exchange: self.parser.exchange_name.clone(),
        })
    }

    /// Apply the response to `request`, unless a newer request superseded it.
    pub fn resolve_banks(
        &mut self,
        request: &BankRequest,
        result: Result<Vec<String>, CatalogError>,
    ) -> BankFetch {
        if request.generation != self.bank_generation
            || request.fiat != self.fiat
            || request.exchange != self.parser.exchange_name
        {
            debug!(
                fiat = %request.fiat,
                exchange = %request.exchange,
                generation = request.generation,
                latest = self.bank_generation,
                "Dropping stale bank options"
            );
            return BankFetch::Stale;
        }

        match result {
            Ok(banks) => {
                self.bank_options = banks;
                BankFetch::Applied(self.bank_options.len())
            }
            Err(e) => {
                warn!(exchange = %request.exchange, error = %e, "Bank options unavailable");
                self.bank_options.clear();
                BankFetch::Failed(Notice::warning(format!(
                    "Could not load banks for {}",
                    request.exchange
                )))
            }
        }
    }

    /// Fetch and apply bank options for the current exchange.
    pub async fn refresh_banks<C: Catalog + ?Sized>(&mut self, catalog: &C) -> Option<BankFetch> {
        let request = self.request_banks()?;
        let result = catalog.list_banks(&request.fiat, &request.exchange).await;
        Some(self.resolve_banks(&request, result))
    }

    /// Inline problems: no exchange, no banks.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.parser.exchange_name.is_empty() {
            issues.push(ValidationIssue::new(
                "exchange_name",
                "Please select an exchange!",
            ));
        }
        if self.parser.banks.is_empty() {
            issues.push(ValidationIssue::new("banks", "Please select banks!"));
        }
        issues
    }

    /// Read-only rendering.
    pub fn summary(&self, position: usize) -> String {
        let mut out = format!(
            "{}\nBanks: {}\n-- Buy Filter --\n{}",
            self.display_name(position),
            self.parser.banks.join(", "),
            FilterEditor::new(Some(self.parser.filter_buy.clone()), Mode::View).summary()
        );
        if !self.mirror {
            out.push_str("\n-- Sell Filter --\n");
            out.push_str(
                &FilterEditor::new(Some(self.parser.filter_sell.clone()), Mode::View).summary(),
            );
        }
        out
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        match self.mode {
            Mode::Edit => Ok(()),
            Mode::View => Err(EditorError::ReadOnly),
        }
    }
}
