//! Editor for one trade-direction filter.

use super::notice::Mode;
use crate::error::EditorError;
use crate::model::Filter;
use rust_decimal::Decimal;
use tracing::debug;

/// Edits four non-negative bounds and a list of payment methods.
///
/// Every successful setter returns the complete current [`Filter`], which the
/// owning editor takes as the change notification.
#[derive(Debug, Clone)]
pub struct FilterEditor {
    filter: Filter,
    mode: Mode,
}

impl FilterEditor {
    /// Start from `initial`, or a zeroed filter.
    pub fn new(initial: Option<Filter>, mode: Mode) -> Self {
        Self {
            filter: initial.unwrap_or_default(),
            mode,
        }
    }

    pub fn value(&self) -> &Filter {
        &self.filter
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_min_amount(&mut self, value: Decimal) -> Result<Filter, EditorError> {
        self.set_bound("min_amount", value, |f| &mut f.min_amount)
    }

    pub fn set_max_amount(&mut self, value: Decimal) -> Result<Filter, EditorError> {
        self.set_bound("max_amount", value, |f| &mut f.max_amount)
    }

    pub fn set_min_price(&mut self, value: Decimal) -> Result<Filter, EditorError> {
        self.set_bound("min_price", value, |f| &mut f.min_price)
    }

    pub fn set_max_price(&mut self, value: Decimal) -> Result<Filter, EditorError> {
        self.set_bound("max_price", value, |f| &mut f.max_price)
    }

    /// Replace the accepted payment methods. Blank and repeated labels are dropped.
    pub fn set_payment_methods<I, S>(&mut self, methods: I) -> Result<Filter, EditorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_editable()?;

        let mut labels: Vec<String> = Vec::new();
        for method in methods {
            let method: String = method.into();
            let method = method.trim().to_string();
            if !method.is_empty() && !labels.contains(&method) {
                labels.push(method);
            }
        }

        self.filter.payment_methods = labels;
        debug!(methods = ?self.filter.payment_methods, "Payment methods updated");
        Ok(self.filter.clone())
    }

    fn set_bound<F>(
        &mut self,
        field: &'static str,
        value: Decimal,
        slot: F,
    ) -> Result<Filter, EditorError>
    where
        F: FnOnce(&mut Filter) -> &mut Decimal,
    {
        self.ensure_editable()?;
        if value < Decimal::ZERO {
            return Err(EditorError::NegativeValue { field, value });
        }

        *slot(&mut self.filter) = value;
        debug!(field, %value, "Filter bound updated");
        Ok(self.filter.clone())
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        match self.mode {
            Mode::Edit => Ok(()),
            Mode::View => Err(EditorError::ReadOnly),
        }
    }

    /// Read-only rendering.
    pub fn summary(&self) -> String {
        let f = &self.filter;
        format!(
            "Min Amount: {}\nMax Amount: {}\nMin Price: {}\nMax Price: {}\nPayment Methods: {}",
            f.min_amount,
            f.max_amount,
            f.min_price,
            f.max_price,
            f.payment_methods.join(", ")
        )
    }
}
