//! Root controller: fiat selection, the soup list and submission.

use super::notice::{Mode, Notice, ValidationIssue};
use super::parser::BankFetch;
use super::soup::ExchangeSoupEditor;
use crate::catalog::Catalog;
use crate::error::EditorError;
use crate::model::{ExchangeSoup, Fiat};
use crate::persistence::SettingsStore;
use tracing::{debug, error, info, warn};

/// Owns the selected fiat and its soup editors, and talks to the catalog
/// and the settings store.
///
/// Notices for the user are queued and drained with [`take_notices`].
///
/// [`take_notices`]: RootController::take_notices
pub struct RootController<C, S> {
    catalog: C,
    store: S,
    fiats: Vec<String>,
    selected_fiat: Option<String>,
    exchange_options: Vec<String>,
    soups: Vec<ExchangeSoupEditor>,
    notices: Vec<Notice>,
}

impl<C: Catalog, S: SettingsStore> RootController<C, S> {
    pub fn new(catalog: C, store: S) -> Self {
        Self {
            catalog,
            store,
            fiats: Vec::new(),
            selected_fiat: None,
            exchange_options: Vec::new(),
            soups: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fiats(&self) -> &[String] {
        &self.fiats
    }

    pub fn selected_fiat(&self) -> Option<&str> {
        self.selected_fiat.as_deref()
    }

    pub fn soup_editors(&self) -> &[ExchangeSoupEditor] {
        &self.soups
    }

    /// Current soup list.
    pub fn soups(&self) -> Vec<ExchangeSoup> {
        self.soups.iter().map(ExchangeSoupEditor::value).collect()
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Load the fiat catalog.
    pub async fn mount(&mut self) {
        match self.catalog.list_fiats().await {
            Ok(fiats) => {
                debug!(count = fiats.len(), "Fiat catalog loaded");
                self.fiats = fiats;
            }
            Err(e) => {
                warn!(error = %e, "Fiat catalog unavailable");
                self.fiats.clear();
                self.notices.push(Notice::warning("Could not load fiats"));
            }
        }
    }

    /// Select `fiat` and replace the soup list with its saved soups.
    ///
    /// Unsaved edits of the previous fiat are discarded, not merged.
    pub async fn select_fiat(&mut self, fiat: &str) -> Result<(), EditorError> {
        if !self.fiats.is_empty() && !self.fiats.iter().any(|f| f == fiat) {
            return Err(EditorError::UnknownOption {
                kind: "fiat",
                value: fiat.to_string(),
            });
        }

        if !self.soups.is_empty() {
            debug!(
                previous = ?self.selected_fiat,
                dropped = self.soups.len(),
                "Replacing in-memory soups"
            );
        }

        self.selected_fiat = Some(fiat.to_string());
        let saved = self
            .store
            .load_all()
            .remove(fiat)
            .map(|f| f.exchange_soups)
            .unwrap_or_default();

        self.exchange_options = match self.catalog.list_exchanges(fiat).await {
            Ok(options) => options,
            Err(e) => {
                warn!(fiat, error = %e, "Exchange options unavailable");
                self.notices.push(Notice::warning("Could not load exchanges"));
                Vec::new()
            }
        };

        self.soups = saved
            .into_iter()
            .map(|soup| {
                let is_new = soup.name.is_empty();
                let mut editor = ExchangeSoupEditor::new(fiat, Some(soup), Mode::View, is_new);
                editor.set_exchange_options(self.exchange_options.clone());
                editor
            })
            .collect();

        for soup in &mut self.soups {
            let failures = soup.refresh_all_banks(&self.catalog).await;
            self.notices.extend(failures);
        }

        info!(fiat, soups = self.soups.len(), "Fiat selected");
        Ok(())
    }

    /// Append a new soup carrying one blank exchange parser.
    pub fn add_soup(&mut self) -> Result<ExchangeSoup, EditorError> {
        let fiat = self
            .selected_fiat
            .as_deref()
            .ok_or(EditorError::NoFiatSelected)?;

        let mut editor = ExchangeSoupEditor::blank(fiat);
        editor.set_exchange_options(self.exchange_options.clone());
        let soup = editor.value();
        self.soups.push(editor);

        debug!(fiat, count = self.soups.len(), "Soup added");
        Ok(soup)
    }

    /// Remove the soup at `index`. Removing the last soup is allowed.
    pub fn remove_soup(&mut self, index: usize) -> Result<ExchangeSoup, EditorError> {
        self.check_index(index)?;
        let removed = self.soups.remove(index).value();
        debug!(soup = %removed.name, index, "Soup removed");
        Ok(removed)
    }

    /// Run `edit` against the soup at `index`. Rejections are also queued
    /// as notices.
    pub fn edit_soup<F>(&mut self, index: usize, edit: F) -> Result<ExchangeSoup, EditorError>
    where
        F: FnOnce(&mut ExchangeSoupEditor) -> Result<ExchangeSoup, EditorError>,
    {
        self.check_index(index)?;
        edit(&mut self.soups[index]).inspect_err(|e| {
            warn!(index, error = %e, "Soup edit rejected");
            self.notices.push(Notice::from(e));
        })
    }

    /// Load bank options for one exchange of one soup.
    pub async fn refresh_banks(&mut self, soup: usize, exchange: usize) -> Result<(), EditorError> {
        self.check_index(soup)?;
        if let Some(BankFetch::Failed(notice)) =
            self.soups[soup].refresh_banks(exchange, &self.catalog).await?
        {
            self.notices.push(notice);
        }
        Ok(())
    }

    /// Inline problems across all soups.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        self.soups
            .iter()
            .enumerate()
            .flat_map(|(i, soup)| {
                let path = format!("soups[{i}]");
                soup.issues().into_iter().map(move |issue| issue.nested(&path))
            })
            .collect()
    }

    /// Save the selected fiat with the current soup list.
    ///
    /// The in-memory list is kept whatever the outcome.
    pub fn submit(&mut self) -> Result<Fiat, EditorError> {
        let result = self.try_submit();
        match &result {
            Ok(fiat) => {
                info!(fiat = %fiat.name, soups = fiat.exchange_soups.len(), "Fiat settings saved");
                self.notices
                    .push(Notice::success("Fiat settings saved successfully"));
            }
            Err(e) => {
                error!(error = %e, "Submit failed");
                self.notices.push(Notice::from(e));
            }
        }
        result
    }

    fn try_submit(&self) -> Result<Fiat, EditorError> {
        let fiat = self
            .selected_fiat
            .as_deref()
            .ok_or(EditorError::NoFiatSelected)?;
        if self.soups.is_empty() {
            return Err(EditorError::NoSoups);
        }

        for issue in self.issues() {
            warn!(fiat, %issue, "Submitting with incomplete field");
        }
        for (i, soup) in self.soups.iter().enumerate() {
            for (j, exchange) in soup.exchanges().iter().enumerate() {
                let parser = exchange.value();
                for warning in parser
                    .filter_buy
                    .bound_warnings()
                    .into_iter()
                    .chain(parser.filter_sell.bound_warnings())
                {
                    warn!(fiat, soup = i, exchange = j, %warning, "Filter bounds out of order");
                }
            }
        }

        let aggregate = Fiat::new(fiat, self.soups());
        self.store.save(&aggregate)?;
        Ok(aggregate)
    }

    /// Append the soup at `index` to the saved entry of the selected fiat.
    ///
    /// Falls back to a full [`submit`](Self::submit) when nothing is saved
    /// for the fiat yet.
    pub fn submit_soup(&mut self, index: usize) -> Result<ExchangeSoup, EditorError> {
        let fiat = self
            .selected_fiat
            .clone()
            .ok_or(EditorError::NoFiatSelected)?;
        self.check_index(index)?;

        let soup = self.soups[index].value();
        match self.store.append_soup(&fiat, &soup) {
            Ok(true) => {
                info!(fiat, soup = %soup.name, "Soup appended to saved settings");
                self.notices.push(Notice::success("Soup saved successfully"));
                Ok(soup)
            }
            Ok(false) => {
                debug!(fiat, "Nothing saved yet, submitting the full soup list");
                self.submit().map(|_| soup)
            }
            Err(e) => {
                let err = EditorError::from(e);
                error!(error = %err, "Soup append failed");
                self.notices.push(Notice::from(&err));
                Err(err)
            }
        }
    }

    /// Delete the saved entry of the selected fiat. In-memory soups are kept.
    pub fn delete_saved(&mut self) -> Result<bool, EditorError> {
        let fiat = self
            .selected_fiat
            .clone()
            .ok_or(EditorError::NoFiatSelected)?;
        match self.store.delete_fiat(&fiat) {
            Ok(removed) => {
                if removed {
                    self.notices
                        .push(Notice::success(format!("Deleted saved settings for {fiat}")));
                }
                Ok(removed)
            }
            Err(e) => {
                let err = EditorError::from(e);
                self.notices.push(Notice::from(&err));
                Err(err)
            }
        }
    }

    fn check_index(&self, index: usize) -> Result<(), EditorError> {
        if index < self.soups.len() {
            Ok(())
        } else {
            Err(EditorError::IndexOutOfRange {
                kind: "soup",
                index,
                len: self.soups.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MockCatalog, StaticCatalog};
    use crate::editor::NoticeLevel;
    use crate::error::{CatalogError, StoreError};
    use crate::model::{ExchangeParser, Filter, SettingsMap};
    use crate::persistence::{MockSettingsStore, PersistenceManager};
    use rust_decimal_macros::dec;

    // =========================================================================
    // Test Helpers
    // =========================================================================

    fn controller() -> RootController<StaticCatalog, PersistenceManager> {
        RootController::new(
            StaticCatalog::default(),
            PersistenceManager::new(":memory:", "fiat_settings").unwrap(),
        )
    }

    async fn mounted() -> RootController<StaticCatalog, PersistenceManager> {
        let mut root = controller();
        root.mount().await;
        root
    }

    fn example_filter() -> Filter {
        Filter {
            min_amount: dec!(10),
            max_amount: dec!(1000),
            min_price: dec!(90),
            max_price: dec!(95),
            payment_methods: vec!["card".to_string()],
        }
    }

    /// Walk the editors through the reference EUR soup.
    async fn build_example_soup(root: &mut RootController<StaticCatalog, PersistenceManager>) {
        root.add_soup().unwrap();
        root.edit_soup(0, |s| s.set_name("soup1")).unwrap();
        root.edit_soup(0, |s| s.set_average(dec!(100))).unwrap();
        root.edit_soup(0, |s| s.select_exchange(0, "Binance")).unwrap();
        root.refresh_banks(0, 0).await.unwrap();
        root.edit_soup(0, |s| s.edit_exchange(0, |ex| ex.set_banks(["Tinkoff"])))
            .unwrap();

        let filter = example_filter();
        root.edit_soup(0, |s| {
            s.edit_exchange(0, |ex| {
                ex.edit_buy_filter(|f| {
                    f.set_min_amount(filter.min_amount)?;
                    f.set_max_amount(filter.max_amount)?;
                    f.set_min_price(filter.min_price)?;
                    f.set_max_price(filter.max_price)?;
                    f.set_payment_methods(filter.payment_methods.clone())
                })
            })
        })
        .unwrap();
    }

    // =========================================================================
    // Selection and list management
    // =========================================================================

    #[tokio::test]
    async fn test_mount_loads_fiats() {
        let root = mounted().await;
        assert_eq!(root.fiats(), ["USD", "EUR", "RUB"]);
        assert!(root.selected_fiat().is_none());
    }

    #[tokio::test]
    async fn test_mount_catalog_failure_warns() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_list_fiats()
            .returning(|| Err(CatalogError::Unavailable("down".to_string())));

        let mut root = RootController::new(catalog, MockSettingsStore::new());
        root.mount().await;

        assert!(root.fiats().is_empty());
        let notices = root.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_unsaved_fiat_starts_empty() {
        let mut root = mounted().await;
        root.select_fiat("EUR").await.unwrap();
        assert_eq!(root.selected_fiat(), Some("EUR"));
        assert!(root.soups().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_fiat_rejected() {
        let mut root = mounted().await;
        assert!(matches!(
            root.select_fiat("GBP").await,
            Err(EditorError::UnknownOption { kind: "fiat", .. })
        ));
        assert!(root.selected_fiat().is_none());
    }

    #[tokio::test]
    async fn test_add_soup_has_one_blank_parser() {
        let mut root = mounted().await;
        root.select_fiat("EUR").await.unwrap();

        let soup = root.add_soup().unwrap();
        assert_eq!(soup.exchanges.len(), 1);
        assert_eq!(soup.exchanges[0], ExchangeParser::default());
        assert_eq!(root.soup_editors()[0].mode(), Mode::Edit);
    }

    #[tokio::test]
    async fn test_add_soup_requires_fiat() {
        let mut root = mounted().await;
        assert!(matches!(root.add_soup(), Err(EditorError::NoFiatSelected)));
    }

    #[tokio::test]
    async fn test_remove_soup_has_no_minimum() {
        let mut root = mounted().await;
        root.select_fiat("EUR").await.unwrap();
        root.add_soup().unwrap();
        root.add_soup().unwrap();
        root.edit_soup(1, |s| s.set_name("second")).unwrap();

        assert_eq!(root.remove_soup(0).unwrap().name, "");
        assert_eq!(root.soups()[0].name, "second");
        root.remove_soup(0).unwrap();
        assert!(root.soups().is_empty());
        assert!(root.remove_soup(0).is_err());
    }

    #[tokio::test]
    async fn test_rejected_soup_edit_queues_warning() {
        let mut root = mounted().await;
        root.select_fiat("EUR").await.unwrap();
        root.add_soup().unwrap();

        let err = root.edit_soup(0, |s| s.remove_exchange(0)).unwrap_err();
        assert!(matches!(err, EditorError::LastExchange));
        assert_eq!(root.soups()[0].exchanges.len(), 1);

        let notices = root.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert_eq!(notices[0].message, "At least one exchange is required");
    }

    // =========================================================================
    // Submission
    // =========================================================================

    #[tokio::test]
    async fn test_submit_without_fiat_writes_nothing() {
        let mut store = MockSettingsStore::new();
        store.expect_save().never();

        let mut root = RootController::new(StaticCatalog::default(), store);
        root.mount().await;

        assert!(matches!(root.submit(), Err(EditorError::NoFiatSelected)));
        let notices = root.take_notices();
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "Please select a fiat");
    }

    #[tokio::test]
    async fn test_submit_without_soups_writes_nothing() {
        let mut store = MockSettingsStore::new();
        store.expect_load_all().returning(SettingsMap::new);
        store.expect_save().never();

        let mut root = RootController::new(StaticCatalog::default(), store);
        root.mount().await;
        root.select_fiat("USD").await.unwrap();

        assert!(matches!(root.submit(), Err(EditorError::NoSoups)));
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_edits() {
        let mut store = MockSettingsStore::new();
        store.expect_load_all().returning(SettingsMap::new);
        store.expect_save().times(1).returning(|_| {
            Err(StoreError::Corrupt {
                key: "fiat_settings".to_string(),
                reason: "bad".to_string(),
            })
        });

        let mut root = RootController::new(StaticCatalog::default(), store);
        root.mount().await;
        root.select_fiat("USD").await.unwrap();
        root.add_soup().unwrap();
        root.edit_soup(0, |s| s.set_name("keep me")).unwrap();

        assert!(matches!(root.submit(), Err(EditorError::Persistence(_))));
        assert_eq!(root.soups()[0].name, "keep me");

        let notices = root.take_notices();
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "Failed to save fiat settings");
    }

    #[tokio::test]
    async fn test_submit_soup_appends_to_saved_fiat() {
        let mut store = MockSettingsStore::new();
        store.expect_load_all().returning(SettingsMap::new);
        store
            .expect_append_soup()
            .withf(|fiat, soup| fiat == "USD" && soup.name == "extra")
            .times(1)
            .returning(|_, _| Ok(true));
        store.expect_save().never();

        let mut root = RootController::new(StaticCatalog::default(), store);
        root.mount().await;
        root.select_fiat("USD").await.unwrap();
        root.add_soup().unwrap();
        root.edit_soup(0, |s| s.set_name("extra")).unwrap();

        assert_eq!(root.submit_soup(0).unwrap().name, "extra");
        assert_eq!(root.take_notices()[0].level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_submit_soup_saves_unsaved_fiat() {
        let mut root = mounted().await;
        root.select_fiat("EUR").await.unwrap();
        build_example_soup(&mut root).await;
        root.submit_soup(0).unwrap();

        root.add_soup().unwrap();
        root.edit_soup(1, |s| s.set_name("soup2")).unwrap();
        root.submit_soup(1).unwrap();

        let names: Vec<_> = root.store().load_all()["EUR"]
            .exchange_soups
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, vec!["soup1", "soup2"]);
    }

    #[tokio::test]
    async fn test_reference_eur_soup_is_persisted_exactly() {
        let mut root = mounted().await;
        root.select_fiat("EUR").await.unwrap();
        assert!(root.soups().is_empty());

        build_example_soup(&mut root).await;

        let soup = &root.soups()[0];
        assert_eq!(soup.exchanges[0].filter_sell, soup.exchanges[0].filter_buy);

        let submitted = root.submit().unwrap();
        let expected = ExchangeSoup {
            name: "soup1".to_string(),
            average: dec!(100),
            exchanges: vec![ExchangeParser {
                exchange_name: "Binance".to_string(),
                banks: vec!["Tinkoff".to_string()],
                filter_buy: example_filter(),
                filter_sell: example_filter(),
            }],
        };

        let saved = root.store().load_all();
        assert_eq!(saved["EUR"].exchange_soups[0], expected);
        assert_eq!(saved["EUR"], submitted);

        // Nothing is cleared after a successful save
        assert_eq!(root.soups().len(), 1);
        let notices = root.take_notices();
        assert_eq!(notices.last().unwrap().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_save_and_reselect_round_trip() {
        let mut root = mounted().await;
        root.select_fiat("USD").await.unwrap();
        build_example_soup(&mut root).await;
        let before = root.soups();
        root.submit().unwrap();

        // Switching away drops the in-memory list
        root.select_fiat("EUR").await.unwrap();
        assert!(root.soups().is_empty());

        root.select_fiat("USD").await.unwrap();
        assert_eq!(root.soups(), before);

        // Saved soups reopen read-only with bank options loaded
        let editor = &root.soup_editors()[0];
        assert_eq!(editor.mode(), Mode::View);
        assert_eq!(editor.exchanges()[0].bank_options().len(), 4);
    }

    #[tokio::test]
    async fn test_unsaved_edits_are_replaced_on_switch() {
        let mut root = mounted().await;
        root.select_fiat("USD").await.unwrap();
        root.add_soup().unwrap();

        root.select_fiat("USD").await.unwrap();
        assert!(root.soups().is_empty());
    }

    #[tokio::test]
    async fn test_delete_saved() {
        let mut root = mounted().await;
        root.select_fiat("USD").await.unwrap();
        build_example_soup(&mut root).await;
        root.submit().unwrap();

        assert!(root.delete_saved().unwrap());
        assert!(root.store().load_all().is_empty());
        assert_eq!(root.soups().len(), 1);
        assert!(!root.delete_saved().unwrap());
    }

    #[tokio::test]
    async fn test_issues_reported_for_blank_soup() {
        let mut root = mounted().await;
        root.select_fiat("EUR").await.unwrap();
        root.add_soup().unwrap();

        let fields: Vec<_> = root.issues().into_iter().map(|i| i.field).collect();
        assert!(fields.contains(&"soups[0].name".to_string()));
        assert!(fields.contains(&"soups[0].exchanges[0].banks".to_string()));

        // Incomplete fields do not block a save
        assert!(root.submit().is_ok());
    }
}
