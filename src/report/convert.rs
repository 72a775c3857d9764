use tracing::debug;

use crate::fx::CurrencyConverter;
use crate::models::{Entry, EntryType};

use super::aggregate::{checked_total, entry_currency, entry_timestamp};
use super::calls::{CallPolicy, FX_CONVERTER};
use super::{ConvertedSummary, ReportError};

/// Single-currency totals of `entries` in `target_currency`.
///
/// Each entry is converted at its own transaction date.
pub(crate) async fn convert_entries(
    entries: &[Entry],
    target_currency: &str,
    converter: &dyn CurrencyConverter,
    calls: &CallPolicy,
) -> Result<ConvertedSummary, ReportError> {
    let mut summary = ConvertedSummary {
        target_currency: target_currency.to_string(),
        earnings_minor: 0,
        spending_minor: 0,
        net_minor: 0,
        used_estimate_rate: false,
    };

    for entry in entries {
        let date = entry_timestamp(entry)?.date_naive();
        let from = entry_currency(entry);
        let conversion = calls
            .run(
                FX_CONVERTER,
                converter.convert(entry.amount_minor, &from, target_currency, date),
            )
            .await?;

        let amount = conversion.amount_minor;
        match entry.entry_type {
            EntryType::Income => {
                summary.earnings_minor =
                    checked_total(summary.earnings_minor, amount, "converted earnings")?;
                summary.net_minor = checked_total(summary.net_minor, amount, "converted net")?;
            }
            EntryType::Expense => {
                summary.spending_minor =
                    checked_total(summary.spending_minor, amount, "converted spending")?;
                summary.net_minor = summary
                    .net_minor
                    .checked_sub(amount)
                    .ok_or_else(|| ReportError::AmountOverflow("converted net".to_string()))?;
            }
        }
        summary.used_estimate_rate |= conversion.is_estimate;
    }

    debug!(
        target_currency,
        entries = entries.len(),
        net = summary.net_minor,
        estimate = summary.used_estimate_rate,
        "converted report totals"
    );
    Ok(summary)
}
