mod filter;
mod json_file;
mod memory;

pub use filter::{EntryFilter, LabelMode};
pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::{Context, Result};

use crate::models::{Category, Entry, EntryType, MonthlyCap, MonthlyCapChange, ReportSettings};
use crate::report::{month_key_of, parse_utc_timestamp};

/// Source of income/expense entries for a report.
#[async_trait::async_trait]
pub trait EntrySource: Send + Sync {
    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>>;
}

/// Resolves category ids to display names.
#[async_trait::async_trait]
pub trait CategorySource: Send + Sync {
    /// Unknown ids are simply absent from the result.
    async fn list_categories_by_ids(&self, ids: &[i64]) -> Result<Vec<Category>>;
}

/// Read access to monthly spending caps.
#[async_trait::async_trait]
pub trait CapReader: Send + Sync {
    /// The active cap for `month_key`, or `None` when no cap is configured.
    async fn show_cap(&self, month_key: &str) -> Result<Option<MonthlyCap>>;

    /// Every recorded edit to the cap of `month_key`, in any order.
    async fn cap_history(&self, month_key: &str) -> Result<Vec<MonthlyCapChange>>;

    /// Sum of expense entries in `month_key` denominated in `currency_code`.
    async fn expense_total(&self, month_key: &str, currency_code: &str) -> Result<i64>;
}

/// Persisted report settings.
#[async_trait::async_trait]
pub trait SettingsReader: Send + Sync {
    /// `None` when the user never saved any settings.
    async fn report_settings(&self) -> Result<Option<ReportSettings>>;
}

/// Expense total for one month/currency over an in-memory entry list.
///
/// Entries with an unparseable timestamp cannot be placed in a month and are
/// left out.
pub(crate) fn month_expense_total(
    entries: &[Entry],
    month_key: &str,
    currency_code: &str,
) -> Result<i64> {
    entries
        .iter()
        .filter(|e| e.entry_type == EntryType::Expense)
        .filter(|e| e.currency_code.trim().eq_ignore_ascii_case(currency_code.trim()))
        .filter(|e| {
            parse_utc_timestamp(&e.transaction_date_utc)
                .map(|ts| month_key_of(ts) == month_key)
                .unwrap_or(false)
        })
        .try_fold(0i64, |total, e| {
            total.checked_add(e.amount_minor).with_context(|| {
                format!("Expense total for {month_key} {currency_code} overflows")
            })
        })
}
