//! Error types for the editors, the catalog and the settings store.

use rust_decimal::Decimal;

/// Rejections raised by the editors and the root controller.
///
/// Every variant is scoped to the action that raised it; the editor state
/// is left unchanged.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Please select a fiat")]
    NoFiatSelected,

    #[error("Please add at least one exchange soup")]
    NoSoups,

    #[error("At least one exchange is required")]
    LastExchange,

    #[error("{field} must not be negative (got {value})")]
    NegativeValue { field: &'static str, value: Decimal },

    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Editor is in view mode")]
    ReadOnly,

    #[error("Sell filter mirrors the buy filter; disable mirroring to edit it")]
    SellFilterMirrored,

    #[error("Unknown {kind}: {value}")]
    UnknownOption { kind: &'static str, value: String },

    #[error("Failed to save fiat settings: {0}")]
    Persistence(#[from] StoreError),
}

/// Failures of the settings store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("stored settings under '{key}' are unreadable: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Failures of a catalog lookup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}
