//! Editor for one exchange soup.

use super::notice::{Mode, Notice, ValidationIssue};
use super::parser::{BankFetch, ExchangeParserEditor};
use crate::catalog::Catalog;
use crate::error::EditorError;
use crate::model::{ExchangeParser, ExchangeSoup};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Edits a soup's name and average and owns its exchange parser editors.
///
/// The exchange list never drops below one entry.
#[derive(Debug, Clone)]
pub struct ExchangeSoupEditor {
    fiat: String,
    name: String,
    average: Decimal,
    exchanges: Vec<ExchangeParserEditor>,
    mode: Mode,
    exchange_options: Vec<String>,
}

impl ExchangeSoupEditor {
    /// Start from `initial`, or a soup with one blank parser.
    ///
    /// A new soup opens in edit mode whatever `mode` says.
    pub fn new(
        fiat: impl Into<String>,
        initial: Option<ExchangeSoup>,
        mode: Mode,
        is_new: bool,
    ) -> Self {
        let fiat = fiat.into();
        let mode = if is_new { Mode::Edit } else { mode };
        let mut soup = initial.unwrap_or_default();

        if soup.exchanges.is_empty() {
            warn!(soup = %soup.name, "Soup without exchanges; adding a blank one");
            soup.exchanges.push(ExchangeParser::default());
        }

        let exchanges = soup
            .exchanges
            .into_iter()
            .map(|parser| ExchangeParserEditor::new(fiat.clone(), Some(parser), mode))
            .collect();

        Self {
            fiat,
            name: soup.name,
            average: soup.average,
            exchanges,
            mode,
            exchange_options: Vec::new(),
        }
    }

    /// A brand-new soup: blank, one blank parser, edit mode.
    pub fn blank(fiat: impl Into<String>) -> Self {
        Self::new(fiat, None, Mode::Edit, true)
    }

    /// Current soup as its parent sees it.
    pub fn value(&self) -> ExchangeSoup {
        ExchangeSoup {
            name: self.name.clone(),
            average: self.average,
            exchanges: self.exchanges.iter().map(|e| e.value().clone()).collect(),
        }
    }

    pub fn fiat(&self) -> &str {
        &self.fiat
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn exchanges(&self) -> &[ExchangeParserEditor] {
        &self.exchanges
    }

    pub fn exchange(&self, index: usize) -> Option<&ExchangeParserEditor> {
        self.exchanges.get(index)
    }

    pub fn exchange_options(&self) -> &[String] {
        &self.exchange_options
    }

    /// Card title: the soup name, or `Exchange Soup` while unnamed.
    pub fn title(&self) -> &str {
        if self.name.is_empty() {
            "Exchange Soup"
        } else {
            &self.name
        }
    }

    /// Switch between view and edit; the exchange editors follow.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        for exchange in &mut self.exchanges {
            exchange.set_mode(mode);
        }
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.set_mode(self.mode.toggled());
        self.mode
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<ExchangeSoup, EditorError> {
        self.ensure_editable()?;
        self.name = name.into();
        Ok(self.value())
    }

    pub fn set_average(&mut self, average: Decimal) -> Result<ExchangeSoup, EditorError> {
        self.ensure_editable()?;
        if average < Decimal::ZERO {
            return Err(EditorError::NegativeValue {
                field: "average",
                value: average,
            });
        }
        self.average = average;
        Ok(self.value())
    }

    /// Append a blank exchange parser.
    pub fn add_exchange(&mut self) -> Result<ExchangeSoup, EditorError> {
        self.ensure_editable()?;
        self.exchanges
            .push(ExchangeParserEditor::new(self.fiat.clone(), None, self.mode));
        debug!(soup = %self.name, count = self.exchanges.len(), "Exchange added");
        Ok(self.value())
    }

    /// Remove the exchange at `index`. The last remaining exchange stays.
    pub fn remove_exchange(&mut self, index: usize) -> Result<ExchangeSoup, EditorError> {
        if self.exchanges.len() == 1 {
            warn!(soup = %self.name, "Refusing to remove the last exchange");
            return Err(EditorError::LastExchange);
        }
        self.check_index(index)?;

        let removed = self.exchanges.remove(index);
        debug!(
            soup = %self.name,
            exchange = %removed.value().exchange_name,
            index,
            "Exchange removed"
        );
        Ok(self.value())
    }

    /// Run `edit` against the exchange at `index` and re-emit the soup.
    pub fn edit_exchange<F>(&mut self, index: usize, edit: F) -> Result<ExchangeSoup, EditorError>
    where
        F: FnOnce(&mut ExchangeParserEditor) -> Result<ExchangeParser, EditorError>,
    {
        self.check_index(index)?;
        edit(&mut self.exchanges[index])?;
        Ok(self.value())
    }

    /// Choose the exchange for the parser at `index` from the exchange options.
    pub fn select_exchange(
        &mut self,
        index: usize,
        exchange: &str,
    ) -> Result<ExchangeSoup, EditorError> {
        self.ensure_editable()?;
        self.check_index(index)?;
        if !self.exchange_options.iter().any(|e| e == exchange) {
            return Err(EditorError::UnknownOption {
                kind: "exchange",
                value: exchange.to_string(),
            });
        }

        self.exchanges[index].select_exchange(exchange)?;
        Ok(self.value())
    }

    /// Replace the exchange options, e.g. with a list the parent already holds.
    pub fn set_exchange_options(&mut self, options: Vec<String>) {
        self.exchange_options = options;
    }

    /// Load exchange options for this soup's fiat.
    ///
    /// On failure the options fall back to empty and a warning is returned.
    pub async fn refresh_exchanges<C: Catalog + ?Sized>(&mut self, catalog: &C) -> Option<Notice> {
        match catalog.list_exchanges(&self.fiat).await {
            Ok(options) => {
                self.exchange_options = options;
                None
            }
            Err(e) => {
                warn!(fiat = %self.fiat, error = %e, "Exchange options unavailable");
                self.exchange_options.clear();
                Some(Notice::warning("Could not load exchanges"))
            }
        }
    }

    /// Load bank options for the exchange at `index`.
    pub async fn refresh_banks<C: Catalog + ?Sized>(
        &mut self,
        index: usize,
        catalog: &C,
    ) -> Result<Option<BankFetch>, EditorError> {
        self.check_index(index)?;
        Ok(self.exchanges[index].refresh_banks(catalog).await)
    }

    /// Load bank options for every exchange, collecting failure notices.
    pub async fn refresh_all_banks<C: Catalog + ?Sized>(&mut self, catalog: &C) -> Vec<Notice> {
        let mut notices = Vec::new();
        for exchange in &mut self.exchanges {
            if let Some(BankFetch::Failed(notice)) = exchange.refresh_banks(catalog).await {
                notices.push(notice);
            }
        }
        notices
    }

    /// Inline problems of the soup and its exchanges.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new("name", "Please input soup name!"));
        }
        for (i, exchange) in self.exchanges.iter().enumerate() {
            let path = format!("exchanges[{i}]");
            issues.extend(exchange.issues().into_iter().map(|issue| issue.nested(&path)));
        }
        issues
    }

    /// Read-only rendering.
    pub fn summary(&self) -> String {
        let mut out = format!("{}\nAverage: {}", self.title(), self.average);
        for (i, exchange) in self.exchanges.iter().enumerate() {
            out.push_str("\n\n");
            out.push_str(&exchange.summary(i + 1));
        }
        out
    }

    fn check_index(&self, index: usize) -> Result<(), EditorError> {
        if index < self.exchanges.len() {
            Ok(())
        } else {
            Err(EditorError::IndexOutOfRange {
                kind: "exchange",
                index,
                len: self.exchanges.len(),
            })
        }
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        match self.mode {
            Mode::Edit => Ok(()),
            Mode::View => Err(EditorError::ReadOnly),
        }
    }
}
