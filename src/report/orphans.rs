//! Warnings about entries that were never assigned a category.

use std::collections::{BTreeMap, HashMap};

use crate::models::{Entry, EntryType, ReportSettings};

use super::aggregate::{checked_total, entry_currency, entry_timestamp};
use super::period::month_key_of;
use super::{
    OrphanCountDetails, OrphanSpendingDetails, OrphanTrigger, ReportCapStatus, ReportError,
    ReportPeriod, Warning, WarningCode, WarningDetails,
};

const BPS_SCALE: i128 = 10_000;

pub const DEFAULT_ORPHAN_COUNT_THRESHOLD: i64 = 5;
pub const DEFAULT_ORPHAN_SPENDING_THRESHOLD_BPS: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanThresholds {
    /// Warn when more than this many entries lack a category.
    pub count_threshold: i64,
    /// Warn when uncategorized spend exceeds this share (out of 10000).
    pub spending_threshold_bps: i64,
}

impl Default for OrphanThresholds {
    fn default() -> Self {
        Self {
            count_threshold: DEFAULT_ORPHAN_COUNT_THRESHOLD,
            spending_threshold_bps: DEFAULT_ORPHAN_SPENDING_THRESHOLD_BPS,
        }
    }
}

impl From<ReportSettings> for OrphanThresholds {
    fn from(settings: ReportSettings) -> Self {
        Self {
            count_threshold: settings.orphan_count_threshold,
            spending_threshold_bps: settings.orphan_spending_threshold_bps,
        }
    }
}

/// `floor(part * 10000 / whole)`, or 0 when `whole <= 0`.
///
/// Computed in 128-bit so large minor-unit totals cannot overflow.
pub fn ratio_bps(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    let ratio = i128::from(part) * BPS_SCALE / i128::from(whole);
    i64::try_from(ratio).unwrap_or(if ratio < 0 { i64::MIN } else { i64::MAX })
}

fn exceeds(part: i64, threshold_bps: i64, whole: i64) -> bool {
    i128::from(part) * BPS_SCALE > i128::from(threshold_bps) * i128::from(whole)
}

fn format_bps(bps: i64) -> String {
    format!("{}.{:02}%", bps / 100, (bps % 100).abs())
}

#[derive(Default)]
struct MonthSpend {
    orphan: i64,
    total: i64,
}

/// Count and spending-ratio warnings for uncategorized entries.
///
/// The count covers entries of every type; the spending ratio only looks at
/// expenses and is always bucketed by the entry's own calendar month.
pub fn detect_orphan_warnings(
    entries: &[Entry],
    period: &ReportPeriod,
    caps: &[ReportCapStatus],
    thresholds: OrphanThresholds,
) -> Result<Vec<Warning>, ReportError> {
    let mut warnings = Vec::new();

    let orphan_count = entries.iter().filter(|e| e.is_orphan()).count() as i64;
    if orphan_count > thresholds.count_threshold {
        warnings.push(Warning {
            code: WarningCode::OrphanCountThresholdExceeded,
            message: format!(
                "{orphan_count} uncategorized entries in the report period exceed the threshold of {}",
                thresholds.count_threshold
            ),
            details: WarningDetails::OrphanCount(OrphanCountDetails {
                period_from_utc: period.from_utc.clone(),
                period_to_utc: period.to_utc.clone(),
                orphan_count,
                threshold: thresholds.count_threshold,
            }),
        });
    }

    let mut months: BTreeMap<(String, String), MonthSpend> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.entry_type == EntryType::Expense) {
        let ts = entry_timestamp(entry)?;
        let currency = entry_currency(entry);
        let what = format!("{currency} month spending");
        let spend = months.entry((month_key_of(ts), currency)).or_default();
        spend.total = checked_total(spend.total, entry.amount_minor, &what)?;
        if entry.is_orphan() {
            spend.orphan = checked_total(spend.orphan, entry.amount_minor, &what)?;
        }
    }

    let cap_amounts: HashMap<(&str, &str), i64> = caps
        .iter()
        .map(|c| {
            (
                (c.month_key.as_str(), c.currency_code.as_str()),
                c.cap_amount_minor,
            )
        })
        .collect();

    let threshold_bps = thresholds.spending_threshold_bps;
    for ((month_key, currency_code), spend) in months {
        if spend.orphan <= 0 {
            continue;
        }

        let cap_amount_minor = cap_amounts
            .get(&(month_key.as_str(), currency_code.as_str()))
            .copied();

        let mut triggered_by = Vec::new();
        if spend.total > 0 && exceeds(spend.orphan, threshold_bps, spend.total) {
            triggered_by.push(OrphanTrigger::MonthSpend);
        }
        if let Some(cap) = cap_amount_minor.filter(|cap| *cap > 0) {
            if exceeds(spend.orphan, threshold_bps, cap) {
                triggered_by.push(OrphanTrigger::MonthCap);
            }
        }
        if triggered_by.is_empty() {
            continue;
        }

        let against = match triggered_by.as_slice() {
            [OrphanTrigger::MonthSpend] => "month spending",
            [OrphanTrigger::MonthCap] => "the monthly cap",
            _ => "month spending and the monthly cap",
        };

        warnings.push(Warning {
            code: WarningCode::OrphanSpendingThresholdExceeded,
            message: format!(
                "Uncategorized spending in {month_key} ({currency_code}) exceeds {} of {against}",
                format_bps(threshold_bps)
            ),
            details: WarningDetails::OrphanSpending(OrphanSpendingDetails {
                ratio_to_month_spend_bps: ratio_bps(spend.orphan, spend.total),
                ratio_to_cap_bps: ratio_bps(spend.orphan, cap_amount_minor.unwrap_or(0)),
                month_key,
                currency_code,
                orphan_spend_minor: spend.orphan,
                month_spend_minor: spend.total,
                cap_amount_minor,
                threshold_bps,
                triggered_by,
            }),
        });
    }

    Ok(warnings)
}
