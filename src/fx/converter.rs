use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::format::minor_unit_exponent;

use super::{FxRatePoint, FxRateStore};

/// Result of converting one amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub amount_minor: i64,
    /// Set when the rate was not a historical close for the requested date.
    pub is_estimate: bool,
}

/// Converts minor-unit amounts between currencies as of a calendar date.
#[async_trait::async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert(
        &self,
        amount_minor: i64,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Conversion>;
}

pub struct RateConverter {
    store: Arc<dyn FxRateStore>,
    lookback_days: u32,
    clock: Arc<dyn Clock>,
}

impl RateConverter {
    pub fn new(store: Arc<dyn FxRateStore>) -> Self {
        Self {
            store,
            lookback_days: 7,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Historical close on or shortly before `date`, trying the inverted pair
    /// when the direct one is missing.
    async fn historical_rate(
        &self,
        base: &str,
        quote: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>> {
        for offset in 0..=self.lookback_days {
            let target_date = date - Duration::days(i64::from(offset));
            if let Some(point) = self.store.get_fx_rate(base, quote, target_date).await? {
                debug!(base, quote, date = %target_date, rate = %point.rate, "historical FX rate");
                return Ok(Some(point.rate_decimal()?));
            }
            if let Some(point) = self.store.get_fx_rate(quote, base, target_date).await? {
                debug!(base, quote, date = %target_date, rate = %point.rate, "inverted historical FX rate");
                return invert(&point).map(Some);
            }
        }
        Ok(None)
    }

    /// Newest stored rate for the pair in either direction.
    async fn latest_rate(&self, base: &str, quote: &str) -> Result<Option<Decimal>> {
        let direct = self.store.latest_fx_rate(base, quote).await?;
        let inverse = self.store.latest_fx_rate(quote, base).await?;

        let use_inverse = match (&direct, &inverse) {
            (Some(d), Some(i)) => i.as_of_date > d.as_of_date,
            (None, Some(_)) => true,
            _ => false,
        };

        match (direct, inverse) {
            (_, Some(point)) if use_inverse => {
                debug!(base, quote, date = %point.as_of_date, "estimating with inverted latest FX rate");
                invert(&point).map(Some)
            }
            (Some(point), _) => {
                debug!(base, quote, date = %point.as_of_date, "estimating with latest FX rate");
                point.rate_decimal().map(Some)
            }
            _ => Ok(None),
        }
    }
}

fn invert(point: &FxRatePoint) -> Result<Decimal> {
    let rate = point.rate_decimal()?;
    Decimal::ONE.checked_div(rate).with_context(|| {
        format!(
            "Cannot invert FX rate {} for {}->{}",
            point.rate, point.base, point.quote
        )
    })
}

fn rescale(amount_minor: i64, from_currency: &str, to_currency: &str, rate: Decimal) -> Result<i64> {
    let to_exp = minor_unit_exponent(to_currency);
    let major = Decimal::new(amount_minor, minor_unit_exponent(from_currency));
    let converted = major
        .checked_mul(rate)
        .context("FX conversion overflowed")?
        .round_dp_with_strategy(to_exp, RoundingStrategy::MidpointAwayFromZero);
    converted
        .checked_mul(Decimal::from(10_i64.pow(to_exp)))
        .and_then(|minor| minor.to_i64())
        .context("Converted amount does not fit in minor units")
}

#[async_trait::async_trait]
impl CurrencyConverter for RateConverter {
    async fn convert(
        &self,
        amount_minor: i64,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Conversion> {
        let from = from_currency.trim().to_uppercase();
        let to = to_currency.trim().to_uppercase();

        if from == to {
            return Ok(Conversion {
                amount_minor,
                is_estimate: false,
            });
        }

        let historical = if date <= self.clock.today() {
            self.historical_rate(&from, &to, date).await?
        } else {
            None
        };

        let (rate, is_estimate) = match historical {
            Some(rate) => (rate, false),
            None => match self.latest_rate(&from, &to).await? {
                Some(rate) => (rate, true),
                None => anyhow::bail!("No FX rate found for {from}->{to} on or before {date}"),
            },
        };

        Ok(Conversion {
            amount_minor: rescale(amount_minor, &from, &to, rate)?,
            is_estimate,
        })
    }
}
