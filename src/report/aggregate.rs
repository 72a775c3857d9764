use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::models::{Entry, EntryType};

use super::period::{parse_utc_timestamp, ReportGrouping};
use super::{CategoryTotal, CurrencyTotal, GroupTotal, ReportError, ReportNet, ReportSection};

pub const ORPHAN_CATEGORY_KEY: &str = "orphan";
pub const ORPHAN_CATEGORY_LABEL: &str = "Orphan";
pub const UNKNOWN_CATEGORY_LABEL: &str = "Unknown Category";

/// Category display names keyed by category id.
pub type CategoryLabels = HashMap<i64, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub earnings: ReportSection,
    pub spending: ReportSection,
    pub net: ReportNet,
}

/// Orphans sort before every real category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CategoryBucket {
    Orphan,
    Category(i64),
}

#[derive(Default)]
struct SectionAgg {
    by_currency: BTreeMap<String, i64>,
    by_group: BTreeMap<(String, String), i64>,
    by_category: BTreeMap<(CategoryBucket, String), i64>,
}

/// `total + amount`, or `AmountOverflow` naming the running total.
pub(crate) fn checked_total(total: i64, amount: i64, what: &str) -> Result<i64, ReportError> {
    total
        .checked_add(amount)
        .ok_or_else(|| ReportError::AmountOverflow(what.to_string()))
}

fn accumulate<K: Ord>(
    map: &mut BTreeMap<K, i64>,
    key: K,
    amount: i64,
    what: &str,
) -> Result<(), ReportError> {
    let total = map.entry(key).or_insert(0);
    *total = checked_total(*total, amount, what)?;
    Ok(())
}

impl SectionAgg {
    fn add(
        &mut self,
        period_key: String,
        bucket: CategoryBucket,
        currency: String,
        amount: i64,
    ) -> Result<(), ReportError> {
        let what = format!("{currency} entries");
        accumulate(&mut self.by_currency, currency.clone(), amount, &what)?;
        accumulate(&mut self.by_group, (period_key, currency.clone()), amount, &what)?;
        accumulate(&mut self.by_category, (bucket, currency), amount, &what)
    }

    fn into_section(self, labels: &CategoryLabels) -> ReportSection {
        let by_currency = self
            .by_currency
            .into_iter()
            .map(|(currency_code, total_minor)| CurrencyTotal {
                currency_code,
                total_minor,
            })
            .collect();

        let groups = self
            .by_group
            .into_iter()
            .map(|((period_key, currency_code), total_minor)| GroupTotal {
                period_key,
                currency_code,
                total_minor,
            })
            .collect();

        let categories = self
            .by_category
            .into_iter()
            .map(|((bucket, currency_code), total_minor)| match bucket {
                CategoryBucket::Orphan => CategoryTotal {
                    category_id: None,
                    category_key: ORPHAN_CATEGORY_KEY.to_string(),
                    category_label: ORPHAN_CATEGORY_LABEL.to_string(),
                    currency_code,
                    total_minor,
                },
                CategoryBucket::Category(id) => CategoryTotal {
                    category_id: Some(id),
                    category_key: format!("category:{id}"),
                    category_label: labels
                        .get(&id)
                        .map(|name| name.trim())
                        .filter(|name| !name.is_empty())
                        .unwrap_or(UNKNOWN_CATEGORY_LABEL)
                        .to_string(),
                    currency_code,
                    total_minor,
                },
            })
            .collect();

        ReportSection {
            by_currency,
            groups,
            categories,
        }
    }
}

/// Parse an entry's stored timestamp, failing the whole report on bad data.
pub(crate) fn entry_timestamp(entry: &Entry) -> Result<DateTime<Utc>, ReportError> {
    parse_utc_timestamp(&entry.transaction_date_utc).ok_or_else(|| {
        ReportError::InvalidTransactionDate {
            entry_id: entry.id,
            value: entry.transaction_date_utc.clone(),
        }
    })
}

pub(crate) fn entry_currency(entry: &Entry) -> String {
    entry.currency_code.trim().to_uppercase()
}

/// Sum entries into earnings, spending and net, bucketed by `grouping`.
pub fn aggregate(
    entries: &[Entry],
    grouping: ReportGrouping,
    labels: &CategoryLabels,
) -> Result<Aggregation, ReportError> {
    let mut earnings = SectionAgg::default();
    let mut spending = SectionAgg::default();

    for entry in entries {
        let ts = entry_timestamp(entry)?;
        let period_key = grouping.period_key(ts);
        let bucket = match entry.category_id {
            Some(id) => CategoryBucket::Category(id),
            None => CategoryBucket::Orphan,
        };
        let section = match entry.entry_type {
            EntryType::Income => &mut earnings,
            EntryType::Expense => &mut spending,
        };
        section.add(period_key, bucket, entry_currency(entry), entry.amount_minor)?;
    }

    let net = net_by_currency(&earnings.by_currency, &spending.by_currency)?;

    Ok(Aggregation {
        earnings: earnings.into_section(labels),
        spending: spending.into_section(labels),
        net,
    })
}

fn net_by_currency(
    earnings: &BTreeMap<String, i64>,
    spending: &BTreeMap<String, i64>,
) -> Result<ReportNet, ReportError> {
    let currencies: BTreeSet<&String> = earnings.keys().chain(spending.keys()).collect();
    let by_currency = currencies
        .into_iter()
        .map(|currency| {
            let earned = earnings.get(currency).copied().unwrap_or(0);
            let spent = spending.get(currency).copied().unwrap_or(0);
            let total_minor = earned
                .checked_sub(spent)
                .ok_or_else(|| ReportError::AmountOverflow(format!("{currency} net")))?;
            Ok(CurrencyTotal {
                currency_code: currency.clone(),
                total_minor,
            })
        })
        .collect::<Result<Vec<_>, ReportError>>()?;
    Ok(ReportNet { by_currency })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(rows: &[CurrencyTotal]) -> Vec<(&str, i64)> {
        rows.iter()
            .map(|r| (r.currency_code.as_str(), r.total_minor))
            .collect()
    }

    #[test]
    fn sums_by_currency_and_nets_each_side() {
        let entries = vec![
            Entry::income(1, 10_000, "USD", "2026-02-03T10:00:00Z"),
            Entry::expense(2, 3_000, "USD", "2026-02-04T10:00:00Z"),
            Entry::income(3, 5_000, "EUR", "2026-02-05T10:00:00Z"),
        ];

        let agg = aggregate(&entries, ReportGrouping::Month, &CategoryLabels::new()).unwrap();

        assert_eq!(totals(&agg.earnings.by_currency), vec![("EUR", 5_000), ("USD", 10_000)]);
        assert_eq!(totals(&agg.spending.by_currency), vec![("USD", 3_000)]);
        assert_eq!(totals(&agg.net.by_currency), vec![("EUR", 5_000), ("USD", 7_000)]);
    }

    #[test]
    fn net_is_zero_filled_and_may_be_negative() {
        let entries = vec![
            Entry::expense(1, 700, "GBP", "2026-02-03T10:00:00Z"),
            Entry::income(2, 100, "USD", "2026-02-03T10:00:00Z"),
        ];

        let agg = aggregate(&entries, ReportGrouping::Month, &CategoryLabels::new()).unwrap();

        assert_eq!(totals(&agg.net.by_currency), vec![("GBP", -700), ("USD", 100)]);
    }

    #[test]
    fn groups_by_day_week_and_month() {
        let entries = vec![
            Entry::expense(1, 100, "USD", "2026-02-01T23:00:00Z"),
            Entry::expense(2, 200, "USD", "2026-02-02T01:00:00Z"),
            Entry::expense(3, 400, "USD", "2026-03-02T01:00:00Z"),
        ];
        let labels = CategoryLabels::new();

        let by_day = aggregate(&entries, ReportGrouping::Day, &labels).unwrap();
        let keys: Vec<_> = by_day
            .spending
            .groups
            .iter()
            .map(|g| (g.period_key.as_str(), g.total_minor))
            .collect();
        assert_eq!(keys, vec![("2026-02-01", 100), ("2026-02-02", 200), ("2026-03-02", 400)]);

        // 2026-02-01 is a Sunday: it closes ISO week 5, the Monday opens week 6.
        let by_week = aggregate(&entries, ReportGrouping::Week, &labels).unwrap();
        let keys: Vec<_> = by_week
            .spending
            .groups
            .iter()
            .map(|g| g.period_key.as_str())
            .collect();
        assert_eq!(keys, vec!["2026-W05", "2026-W06", "2026-W10"]);

        let by_month = aggregate(&entries, ReportGrouping::Month, &labels).unwrap();
        let keys: Vec<_> = by_month
            .spending
            .groups
            .iter()
            .map(|g| (g.period_key.as_str(), g.total_minor))
            .collect();
        assert_eq!(keys, vec![("2026-02", 300), ("2026-03", 400)]);
    }

    #[test]
    fn orphan_bucket_is_single_and_first() {
        let entries = vec![
            Entry::expense(1, 100, "USD", "2026-02-01T10:00:00Z").with_category(9),
            Entry::expense(2, 50, "USD", "2026-02-01T10:00:00Z"),
            Entry::expense(3, 25, "USD", "2026-02-02T10:00:00Z").with_category(2),
            Entry::expense(4, 75, "USD", "2026-02-03T10:00:00Z"),
        ];
        let labels = CategoryLabels::from([(2, "Groceries".to_string())]);

        let agg = aggregate(&entries, ReportGrouping::Month, &labels).unwrap();
        let cats = &agg.spending.categories;

        assert_eq!(cats.len(), 3);
        assert_eq!(cats[0].category_key, "orphan");
        assert_eq!(cats[0].category_label, "Orphan");
        assert_eq!(cats[0].category_id, None);
        assert_eq!(cats[0].total_minor, 125);
        assert_eq!(cats[1].category_key, "category:2");
        assert_eq!(cats[1].category_label, "Groceries");
        assert_eq!(cats[2].category_key, "category:9");
        assert_eq!(cats[2].category_label, "Unknown Category");
        assert!(agg.earnings.categories.is_empty());
    }

    #[test]
    fn category_rows_split_by_currency() {
        let entries = vec![
            Entry::expense(1, 100, "usd", "2026-02-01T10:00:00Z").with_category(1),
            Entry::expense(2, 200, "EUR", "2026-02-01T10:00:00Z").with_category(1),
        ];

        let agg = aggregate(&entries, ReportGrouping::Month, &CategoryLabels::new()).unwrap();
        let rows: Vec<_> = agg
            .spending
            .categories
            .iter()
            .map(|c| (c.category_key.as_str(), c.currency_code.as_str()))
            .collect();

        assert_eq!(rows, vec![("category:1", "EUR"), ("category:1", "USD")]);
    }

    #[test]
    fn output_order_does_not_depend_on_input_order() {
        let mut entries = vec![
            Entry::expense(1, 100, "USD", "2026-02-01T10:00:00Z").with_category(3),
            Entry::income(2, 900, "EUR", "2026-01-20T10:00:00Z"),
            Entry::expense(3, 40, "EUR", "2026-01-05T10:00:00Z"),
            Entry::expense(4, 60, "USD", "2026-01-05T10:00:00Z").with_category(1),
        ];
        let labels = CategoryLabels::new();

        let forward = aggregate(&entries, ReportGrouping::Day, &labels).unwrap();
        entries.reverse();
        let backward = aggregate(&entries, ReportGrouping::Day, &labels).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn unparseable_date_fails_the_whole_aggregation() {
        let entries = vec![
            Entry::expense(1, 100, "USD", "2026-02-01T10:00:00Z"),
            Entry::expense(2, 100, "USD", "02/01/2026"),
        ];

        let err = aggregate(&entries, ReportGrouping::Month, &CategoryLabels::new()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::InvalidTransactionDate { entry_id: 2, .. }
        ));
    }

    #[test]
    fn overflowing_totals_are_an_error() {
        let half = i64::MAX / 2 + 1;
        let entries = vec![
            Entry::expense(1, half, "USD", "2026-02-01T00:00:00Z"),
            Entry::expense(2, half, "USD", "2026-02-02T00:00:00Z"),
        ];

        let err = aggregate(&entries, ReportGrouping::Month, &CategoryLabels::new()).unwrap_err();
        assert!(matches!(err, ReportError::AmountOverflow(_)));
    }

    #[test]
    fn net_underflow_is_an_error() {
        let entries = vec![
            Entry::income(1, -2, "USD", "2026-02-01T00:00:00Z"),
            Entry::expense(2, i64::MAX, "USD", "2026-02-02T00:00:00Z"),
        ];

        let err = aggregate(&entries, ReportGrouping::Month, &CategoryLabels::new()).unwrap_err();
        assert!(matches!(err, ReportError::AmountOverflow(ref what) if what == "USD net"));
    }

    #[test]
    fn large_totals_below_the_limit_still_sum() -> Result<(), ReportError> {
        let entries = vec![
            Entry::income(1, i64::MAX - 1, "USD", "2026-02-01T00:00:00Z"),
            Entry::income(2, 1, "USD", "2026-02-02T00:00:00Z"),
        ];

        let agg = aggregate(&entries, ReportGrouping::Month, &CategoryLabels::new())?;
        assert_eq!(totals(&agg.earnings.by_currency), vec![("USD", i64::MAX)]);
        assert_eq!(totals(&agg.net.by_currency), vec![("USD", i64::MAX)]);
        Ok(())
    }
}
