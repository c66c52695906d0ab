use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use super::{PriceLookup, RateLookup};
use crate::error::{AnalysisError, Result};
use crate::models::{Currency, Id};

/// Date-indexed prices and rates held in memory.
///
/// A lookup returns the latest point on or before the requested date. With a
/// lookback window set, points older than the window are ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryMarketData {
    prices: HashMap<Id, BTreeMap<NaiveDate, Decimal>>,
    rates: HashMap<Currency, BTreeMap<NaiveDate, Decimal>>,
    lookback_days: Option<u32>,
}

impl MemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = Some(days);
        self
    }

    pub fn with_price(mut self, security: impl Into<Id>, date: NaiveDate, price: Decimal) -> Self {
        self.put_price(security, date, price);
        self
    }

    pub fn with_rate(mut self, currency: impl Into<Currency>, date: NaiveDate, rate: Decimal) -> Self {
        self.put_rate(currency, date, rate);
        self
    }

    pub fn put_price(&mut self, security: impl Into<Id>, date: NaiveDate, price: Decimal) {
        self.prices
            .entry(security.into())
            .or_default()
            .insert(date, price);
    }

    pub fn put_rate(&mut self, currency: impl Into<Currency>, date: NaiveDate, rate: Decimal) {
        self.rates
            .entry(currency.into())
            .or_default()
            .insert(date, rate);
    }

    fn latest<'a>(
        &self,
        series: Option<&'a BTreeMap<NaiveDate, Decimal>>,
        date: NaiveDate,
    ) -> Option<(&'a NaiveDate, &'a Decimal)> {
        let (found, value) = series?.range(..=date).next_back()?;
        if let Some(days) = self.lookback_days {
            if *found < date - Duration::days(i64::from(days)) {
                return None;
            }
        }
        Some((found, value))
    }
}

impl PriceLookup for MemoryMarketData {
    fn price_for_date(&self, security: &Id, date: NaiveDate) -> Result<Decimal> {
        match self.latest(self.prices.get(security), date) {
            Some((found, price)) => {
                debug!(security = %security, date = %date, found = %found, price = %price, "price found");
                Ok(*price)
            }
            None => Err(AnalysisError::MissingPrice {
                security: security.clone(),
                date,
            }),
        }
    }
}

impl RateLookup for MemoryMarketData {
    fn rate_for_date(&self, currency: &Currency, date: NaiveDate) -> Result<Decimal> {
        match self.latest(self.rates.get(currency), date) {
            Some((found, rate)) => {
                debug!(currency = %currency, date = %date, found = %found, rate = %rate, "rate found");
                Ok(*rate)
            }
            None => Err(AnalysisError::MissingRate {
                currency: currency.clone(),
                date,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateRange;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn latest_point_on_or_before_date_is_used() {
        let store = MemoryMarketData::new()
            .with_price("acme", date(1), dec!(10))
            .with_price("acme", date(10), dec!(12));

        assert_eq!(store.price_for_date(&Id::from("acme"), date(1)).unwrap(), dec!(10));
        assert_eq!(store.price_for_date(&Id::from("acme"), date(9)).unwrap(), dec!(10));
        assert_eq!(store.price_for_date(&Id::from("acme"), date(20)).unwrap(), dec!(12));
        assert_eq!(
            store
                .prices_for_range(&Id::from("acme"), DateRange::new(date(5), date(15)))
                .unwrap(),
            (dec!(10), dec!(12))
        );
    }

    #[test]
    fn misses_before_first_point_and_outside_lookback() {
        let store = MemoryMarketData::new()
            .with_rate("usd", date(10), dec!(0.8))
            .with_lookback_days(3);
        let usd = Currency::new("USD");

        assert_eq!(
            store.rate_for_date(&usd, date(9)).unwrap_err(),
            AnalysisError::MissingRate {
                currency: usd.clone(),
                date: date(9)
            }
        );
        assert_eq!(store.rate_for_date(&usd, date(13)).unwrap(), dec!(0.8));
        assert!(store.rate_for_date(&usd, date(14)).unwrap_err().is_lookup_miss());
    }
}
