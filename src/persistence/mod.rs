//! SQLite persistence for saved fiat settings.
//!
//! All settings live in one JSON blob (a [`SettingsMap`]) stored under a
//! single key of a key-value table. Every write reads the whole blob,
//! replaces one fiat entry and writes the whole blob back inside one
//! transaction. There is no partial update, versioning or schema migration
//! of the blob.

use crate::error::StoreError;
use crate::model::{ExchangeSoup, Fiat, SettingsMap};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info, warn};

/// Load/save contract for saved settings.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore {
    /// All saved fiats. Missing or unreadable settings yield an empty map.
    fn load_all(&self) -> SettingsMap;

    /// Replace the saved entry for `fiat.name` with `fiat`.
    fn save(&self, fiat: &Fiat) -> Result<(), StoreError>;

    /// Drop the saved entry for `fiat`. Returns whether one existed.
    fn delete_fiat(&self, fiat: &str) -> Result<bool, StoreError>;

    /// Append `soup` to an already saved fiat. Returns `false` and writes
    /// nothing when the fiat has no saved entry.
    fn append_soup(&self, fiat: &str, soup: &ExchangeSoup) -> Result<bool, StoreError>;
}

/// SQLite-backed settings store.
pub struct PersistenceManager {
    conn: Connection,
    storage_key: String,
}

impl PersistenceManager {
    /// Open the store, initializing the database if needed.
    pub fn new<P: AsRef<Path>>(db_path: P, storage_key: impl Into<String>) -> Result<Self, StoreError> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        let manager = Self {
            conn,
            storage_key: storage_key.into(),
        };
        manager.init_schema()?;

        info!(key = %manager.storage_key, "Settings store initialized at {:?}", path);
        Ok(manager)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Key the settings blob is stored under.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Raw blob, if one has been written.
    fn read_blob(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
        let blob = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(blob)
    }

    /// Parsed settings. Unlike [`SettingsStore::load_all`], a blob that
    /// fails to parse is an error, so writes never clobber it.
    fn read_settings(conn: &Connection, key: &str) -> Result<SettingsMap, StoreError> {
        match Self::read_blob(conn, key)? {
            Some(blob) => serde_json::from_str(&blob).map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(SettingsMap::new()),
        }
    }

    /// Read-modify-write the blob in one transaction.
    ///
    /// `update` returns whether anything changed; nothing is written otherwise.
    fn update_settings<F, T>(&self, update: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut SettingsMap) -> (bool, T),
    {
        let tx = self.conn.unchecked_transaction()?;

        let mut settings = Self::read_settings(&tx, &self.storage_key)?;
        let (changed, result) = update(&mut settings);

        if changed {
            let blob = serde_json::to_string(&settings)?;
            tx.execute(
                r#"
                INSERT INTO kv_store (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = ?2,
                    updated_at = ?3
                "#,
                params![self.storage_key, blob, Utc::now().to_rfc3339()],
            )?;
        }

        tx.commit()?;
        Ok(result)
    }

    /// When the blob was last written, if ever.
    #[cfg(test)]
    fn last_updated(&self) -> Result<Option<String>, StoreError> {
        let updated = self
            .conn
            .query_row(
                "SELECT updated_at FROM kv_store WHERE key = ?1",
                params![self.storage_key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(updated)
    }

    /// Overwrite the raw blob.
    #[cfg(test)]
    fn write_raw(&self, blob: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3
            "#,
            params![self.storage_key, blob, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl SettingsStore for PersistenceManager {
    fn load_all(&self) -> SettingsMap {
        match Self::read_settings(&self.conn, &self.storage_key) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable saved settings");
                SettingsMap::new()
            }
        }
    }

    fn save(&self, fiat: &Fiat) -> Result<(), StoreError> {
        self.update_settings(|settings| {
            settings.insert(fiat.name.clone(), fiat.clone());
            (true, ())
        })?;

        debug!(
            fiat = %fiat.name,
            soups = fiat.exchange_soups.len(),
            "Fiat settings saved"
        );
        Ok(())
    }

    fn delete_fiat(&self, fiat: &str) -> Result<bool, StoreError> {
        let removed = self.update_settings(|settings| {
            let removed = settings.remove(fiat).is_some();
            (removed, removed)
        })?;

        if removed {
            info!(fiat, "Deleted saved fiat settings");
        }
        Ok(removed)
    }

    fn append_soup(&self, fiat: &str, soup: &ExchangeSoup) -> Result<bool, StoreError> {
        let appended = self.update_settings(|settings| match settings.get_mut(fiat) {
            Some(saved) => {
                saved.exchange_soups.push(soup.clone());
                (true, true)
            }
            None => (false, false),
        })?;

        debug!(fiat, soup = %soup.name, appended, "Append soup");
        Ok(appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExchangeParser, Filter};
    use rust_decimal_macros::dec;

    fn store() -> PersistenceManager {
        PersistenceManager::new(":memory:", "fiat_settings").unwrap()
    }

    fn sample_soup(name: &str) -> ExchangeSoup {
        let filter = Filter {
            min_amount: dec!(10),
            max_amount: dec!(1000),
            min_price: dec!(90),
            max_price: dec!(95),
            payment_methods: vec!["card".to_string()],
        };
        ExchangeSoup {
            name: name.to_string(),
            average: dec!(100),
            exchanges: vec![ExchangeParser {
                exchange_name: "Binance".to_string(),
                banks: vec!["Tinkoff".to_string()],
                filter_buy: filter.clone(),
                filter_sell: filter,
            }],
        }
    }

    #[test]
    fn test_empty_store_loads_empty_map() {
        let manager = store();
        assert!(manager.load_all().is_empty());
        assert!(manager.last_updated().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let manager = store();
        let fiat = Fiat::new("USD", vec![sample_soup("soup1")]);

        manager.save(&fiat).unwrap();

        let loaded = manager.load_all();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["USD"], fiat);
        assert!(manager.last_updated().unwrap().is_some());
    }

    #[test]
    fn test_save_replaces_only_that_fiat() {
        let manager = store();
        manager.save(&Fiat::new("USD", vec![sample_soup("a")])).unwrap();
        manager.save(&Fiat::new("EUR", vec![sample_soup("b")])).unwrap();

        let replacement = Fiat::new("USD", vec![sample_soup("c"), sample_soup("d")]);
        manager.save(&replacement).unwrap();

        let loaded = manager.load_all();
        assert_eq!(loaded["USD"], replacement);
        assert_eq!(loaded["EUR"].exchange_soups[0].name, "b");
    }

    #[test]
    fn test_blob_stores_decimals_as_numbers() {
        let manager = store();
        manager
            .save(&Fiat::new("USD", vec![ExchangeSoup {
                name: "soup1".to_string(),
                average: dec!(100),
                ..ExchangeSoup::default()
            }]))
            .unwrap();

        let blob = PersistenceManager::read_blob(&manager.conn, "fiat_settings")
            .unwrap()
            .unwrap();
        assert!(blob.contains(r#""average":100"#));
        assert!(blob.contains(r#""min_amount":0"#));
        assert_eq!(manager.load_all()["USD"].exchange_soups[0].average, dec!(100));
    }

    #[test]
    fn test_legacy_string_decimals_still_load() {
        let manager = store();
        manager
            .write_raw(r#"{"USD":{"name":"USD","exchange_soups":[{"name":"a","average":"99.5","exchanges":[]}]}}"#)
            .unwrap();

        assert_eq!(manager.load_all()["USD"].exchange_soups[0].average, dec!(99.5));
    }

    #[test]
    fn test_unwritable_parent_dir_is_reported() {
        let file = std::env::temp_dir().join(format!("soup-settings-{}", std::process::id()));
        std::fs::write(&file, b"").unwrap();

        let result = PersistenceManager::new(file.join("nested").join("settings.db"), "fiat_settings");
        assert!(matches!(result, Err(StoreError::Io(_))));

        std::fs::remove_file(&file).unwrap();
    }

    #[test]
    fn test_corrupt_blob() {
        let manager = store();
        manager.write_raw("{not json").unwrap();

        // Reads fall back to empty
        assert!(manager.load_all().is_empty());

        // Writes refuse to clobber
        let err = manager.save(&Fiat::new("USD", vec![])).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_delete_fiat() {
        let manager = store();
        manager.save(&Fiat::new("USD", vec![sample_soup("a")])).unwrap();

        assert!(manager.delete_fiat("USD").unwrap());
        assert!(!manager.delete_fiat("USD").unwrap());
        assert!(manager.load_all().is_empty());
    }

    #[test]
    fn test_append_soup_requires_saved_fiat() {
        let manager = store();
        assert!(!manager.append_soup("USD", &sample_soup("a")).unwrap());
        assert!(manager.load_all().is_empty());

        manager.save(&Fiat::new("USD", vec![sample_soup("a")])).unwrap();
        assert!(manager.append_soup("USD", &sample_soup("b")).unwrap());

        let names: Vec<_> = manager.load_all()["USD"]
            .exchange_soups
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
