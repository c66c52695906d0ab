use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{AnalysisError, Result};
use crate::models::{Currency, DateRange, Id};

/// Security prices by date, in the security's own currency.
pub trait PriceLookup {
    fn price_for_date(&self, security: &Id, date: NaiveDate) -> Result<Decimal>;

    /// Prices at the start and end of `range`.
    fn prices_for_range(&self, security: &Id, range: DateRange) -> Result<(Decimal, Decimal)> {
        Ok((
            self.price_for_date(security, range.start)?,
            self.price_for_date(security, range.end)?,
        ))
    }
}

/// Exchange rates by date.
///
/// A rate converts one unit of `currency` into the reporting currency, so
/// `local = foreign * rate`. Callers never ask for the reporting currency.
pub trait RateLookup {
    fn rate_for_date(&self, currency: &Currency, date: NaiveDate) -> Result<Decimal>;

    fn rates_for_range(&self, currency: &Currency, range: DateRange) -> Result<(Decimal, Decimal)> {
        Ok((
            self.rate_for_date(currency, range.start)?,
            self.rate_for_date(currency, range.end)?,
        ))
    }
}

/// Both lookups, as consumed by the analysis.
pub trait MarketData: PriceLookup + RateLookup + Send + Sync {
    fn prices(&self) -> &dyn PriceLookup;

    fn rates(&self) -> &dyn RateLookup;
}

impl<T: PriceLookup + RateLookup + Send + Sync> MarketData for T {
    fn prices(&self) -> &dyn PriceLookup {
        self
    }

    fn rates(&self) -> &dyn RateLookup {
        self
    }
}

/// Rate for `currency`, short-circuiting the reporting currency to one.
pub fn effective_rate(
    rates: &dyn RateLookup,
    currency: &Currency,
    reporting: &Currency,
    date: NaiveDate,
) -> Result<Decimal> {
    if currency == reporting {
        Ok(Decimal::ONE)
    } else {
        rates.rate_for_date(currency, date)
    }
}

/// Convert an amount in a foreign currency into the reporting currency.
pub fn to_local(amount: Decimal, rate: Decimal, reporting: &Currency) -> Decimal {
    reporting.round(amount * rate)
}

/// Convert a reporting-currency amount back into `currency`.
pub fn from_local(local: Decimal, rate: Decimal, currency: &Currency) -> Result<Decimal> {
    if rate.is_zero() {
        return Err(AnalysisError::ZeroRate {
            currency: currency.clone(),
            amount: local.to_string(),
        });
    }
    Ok(currency.round(local / rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn conversion_round_trips_within_rounding() -> Result<()> {
        let gbp = Currency::new("GBP");
        let usd = Currency::new("USD");
        for (amount, rate) in [
            (dec!(123.45), dec!(0.80)),
            (dec!(1000.00), dec!(0.7893)),
            (dec!(0.01), dec!(1.2345)),
            (dec!(-250.10), dec!(0.8123)),
        ] {
            let local = to_local(amount, rate, &gbp);
            let back = from_local(local, rate, &usd)?;
            // One minor unit of the reporting currency, scaled back by the rate.
            let tolerance = dec!(0.01) / rate + dec!(0.01);
            assert!(
                (back - amount).abs() <= tolerance,
                "{amount} at {rate} came back as {back}"
            );
        }
        Ok(())
    }

    #[test]
    fn zero_rate_cannot_convert_back() {
        let err = from_local(dec!(10), Decimal::ZERO, &Currency::new("USD")).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::ZeroRate {
                currency: Currency::new("USD"),
                amount: "10".to_string(),
            }
        );
        assert!(err.is_data_consistency());
    }
}
