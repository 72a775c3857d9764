use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily close rate: one unit of `base` buys `rate` units of `quote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxRatePoint {
    pub base: String,
    pub quote: String,
    pub as_of_date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub rate: String,
    pub source: String,
}

impl FxRatePoint {
    /// A close rate stamped at midnight UTC of `as_of_date`.
    pub fn close(
        base: impl Into<String>,
        quote: impl Into<String>,
        as_of_date: NaiveDate,
        rate: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into().trim().to_uppercase(),
            quote: quote.into().trim().to_uppercase(),
            as_of_date,
            timestamp: as_of_date.and_time(NaiveTime::MIN).and_utc(),
            rate: rate.into(),
            source: source.into(),
        }
    }

    pub fn rate_decimal(&self) -> Result<Decimal> {
        Decimal::from_str(self.rate.trim()).with_context(|| {
            format!(
                "Invalid FX rate {:?} for {}->{} on {}",
                self.rate, self.base, self.quote, self.as_of_date
            )
        })
    }
}
