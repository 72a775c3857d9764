use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;

use super::FxRatePoint;

#[async_trait::async_trait]
pub trait FxRateStore: Send + Sync {
    /// The close rate recorded for exactly `date`, if any.
    async fn get_fx_rate(&self, base: &str, quote: &str, date: NaiveDate)
        -> Result<Option<FxRatePoint>>;

    /// The most recent rate stored for the pair regardless of date.
    async fn latest_fx_rate(&self, base: &str, quote: &str) -> Result<Option<FxRatePoint>>;

    async fn put_fx_rates(&self, rates: &[FxRatePoint]) -> Result<()>;
}

/// Newest by `as_of_date`, then by `timestamp`.
pub(crate) fn newest(rates: impl IntoIterator<Item = FxRatePoint>) -> Option<FxRatePoint> {
    rates
        .into_iter()
        .max_by(|a, b| {
            a.as_of_date
                .cmp(&b.as_of_date)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        })
}

#[derive(Default)]
pub struct MemoryFxRateStore {
    rates: tokio::sync::Mutex<HashMap<(String, String, NaiveDate), FxRatePoint>>,
}

impl MemoryFxRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FxRateStore for MemoryFxRateStore {
    async fn get_fx_rate(
        &self,
        base: &str,
        quote: &str,
        date: NaiveDate,
    ) -> Result<Option<FxRatePoint>> {
        let rates = self.rates.lock().await;
        Ok(rates
            .get(&(base.to_string(), quote.to_string(), date))
            .cloned())
    }

    async fn latest_fx_rate(&self, base: &str, quote: &str) -> Result<Option<FxRatePoint>> {
        let rates = self.rates.lock().await;
        Ok(newest(
            rates
                .values()
                .filter(|r| r.base == base && r.quote == quote)
                .cloned(),
        ))
    }

    async fn put_fx_rates(&self, rates: &[FxRatePoint]) -> Result<()> {
        if rates.is_empty() {
            return Ok(());
        }
        let mut store = self.rates.lock().await;
        for rate in rates {
            let key = (rate.base.clone(), rate.quote.clone(), rate.as_of_date);
            let replace = store
                .get(&key)
                .map(|existing| rate.timestamp >= existing.timestamp)
                .unwrap_or(true);
            if replace {
                store.insert(key, rate.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn latest_picks_newest_date_for_pair() -> Result<()> {
        let store = MemoryFxRateStore::new();
        store
            .put_fx_rates(&[
                FxRatePoint::close("EUR", "USD", day("2026-03-02"), "1.09", "test"),
                FxRatePoint::close("EUR", "USD", day("2026-03-05"), "1.11", "test"),
                FxRatePoint::close("GBP", "USD", day("2026-03-09"), "1.27", "test"),
            ])
            .await?;

        let latest = store.latest_fx_rate("EUR", "USD").await?.unwrap();
        assert_eq!(latest.as_of_date, day("2026-03-05"));
        assert_eq!(latest.rate, "1.11");

        assert!(store.latest_fx_rate("USD", "EUR").await?.is_none());
        assert!(store
            .get_fx_rate("EUR", "USD", day("2026-03-03"))
            .await?
            .is_none());
        Ok(())
    }
}
