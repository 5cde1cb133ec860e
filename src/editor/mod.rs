//! Settings editors.
//!
//! Edits flow bottom-up: filter -> exchange parser -> soup -> root. Each
//! editor returns its complete value from every successful edit, and the
//! parent that owns it takes that value as the change notification.
//! - `filter`: amount/price bounds and payment methods
//! - `parser`: bank selection, buy/sell filters, sell mirroring
//! - `soup`: name, average and the exchange list
//! - `root`: fiat selection, soup list, submission

mod filter;
mod notice;
mod parser;
mod root;
mod soup;

pub use filter::FilterEditor;
pub use notice::{Mode, Notice, NoticeLevel, ValidationIssue};
pub use parser::{BankFetch, BankRequest, ExchangeParserEditor};
pub use root::RootController;
pub use soup::ExchangeSoupEditor;
