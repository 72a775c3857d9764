#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tallybook::fx::FxRatePoint;
use tallybook::models::{Category, Entry, MonthlyCap, MonthlyCapChange};
use tallybook::storage::{EntryFilter, EntrySource};

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn fx(base: &str, quote: &str, date: &str, rate: &str) -> FxRatePoint {
    FxRatePoint::close(base, quote, day(date), rate, "test")
}

/// Q1 2026 ledger: salary, rent, an uncategorized EUR purchase, a category
/// with no stored name, a future-dated uncategorized EUR income and one entry
/// past the quarter.
pub fn q1_entries() -> Vec<Entry> {
    vec![
        Entry::income(1, 500_000, "USD", "2026-01-05T09:00:00Z").with_category(1),
        Entry::expense(2, 120_000, "USD", "2026-01-06T09:00:00Z").with_category(2),
        Entry::expense(3, 10_000, "EUR", "2026-01-12T18:00:00Z").with_note("market"),
        Entry::expense(4, 30_000, "USD", "2026-02-03T12:00:00Z").with_category(3),
        Entry::income(5, 20_000, "EUR", "2026-03-02T08:00:00Z"),
        Entry::expense(6, 5_000, "USD", "2026-03-22T23:30:00-02:00").with_category(2),
        Entry::expense(7, 999, "USD", "2026-04-01T00:00:00Z").with_category(2),
    ]
}

pub fn q1_categories() -> Vec<Category> {
    vec![Category::new(1, "Salary"), Category::new(2, "Rent")]
}

pub fn q1_caps() -> Vec<MonthlyCap> {
    vec![
        MonthlyCap::new("2026-01", "USD", 100_000),
        MonthlyCap::new("2026-03", "usd", 4_000),
    ]
}

pub fn cap_change(id: i64, month_key: &str, changed_at: &str, new_amount: i64) -> MonthlyCapChange {
    MonthlyCapChange {
        id,
        month_key: month_key.to_string(),
        currency_code: "USD".to_string(),
        previous_amount_minor: None,
        new_amount_minor: new_amount,
        changed_at_utc: changed_at.to_string(),
    }
}

/// Entry source that never answers. Records when its pending call is dropped.
#[derive(Default)]
pub struct HangingEntries {
    pub dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntrySource for HangingEntries {
    async fn list_entries(&self, _filter: &EntryFilter) -> Result<Vec<Entry>> {
        let _flag = DropFlag(self.dropped.clone());
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}
