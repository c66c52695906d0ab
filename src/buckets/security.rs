use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::Bucket;
use crate::error::Result;
use crate::history::BucketHistory;
use crate::market_data::{PriceLookup, RateLookup};
use crate::models::{Currency, DateRange, HoldingId, SecurityClass};
use crate::values::{Attribute, BucketValues, SecurityAttr};

/// One security held in one portfolio.
#[derive(Debug, Clone)]
pub struct SecurityBucket {
    holding: HoldingId,
    name: String,
    class: SecurityClass,
    currency: Currency,
    reporting: Currency,
    foreign: bool,
    closed: bool,
    relevant: bool,
    history: BucketHistory<SecurityAttr>,
}

impl SecurityBucket {
    pub fn new(
        holding: HoldingId,
        name: impl Into<String>,
        class: SecurityClass,
        currency: Currency,
        reporting: &Currency,
    ) -> Self {
        let foreign = currency != *reporting;
        Self {
            history: BucketHistory::new(Self::allocate_values(foreign)),
            holding,
            name: name.into(),
            class,
            currency,
            reporting: reporting.clone(),
            foreign,
            closed: false,
            relevant: false,
        }
    }

    pub fn allocate_values(foreign: bool) -> BucketValues<SecurityAttr> {
        let attrs: Vec<SecurityAttr> = SecurityAttr::ALL
            .iter()
            .copied()
            .filter(|attr| {
                foreign
                    || !matches!(
                        attr,
                        SecurityAttr::ForeignInvested
                            | SecurityAttr::ForeignValuation
                            | SecurityAttr::ForeignValueDelta
                            | SecurityAttr::ForeignMarketGrowth
                            | SecurityAttr::LocalMarketGrowth
                            | SecurityAttr::ExchangeRate
                    )
            })
            .collect();
        BucketValues::allocated(&attrs)
    }

    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    pub fn holding(&self) -> &HoldingId {
        &self.holding
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> SecurityClass {
        self.class
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn is_foreign_currency(&self) -> bool {
        self.foreign
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_relevant(&self) -> bool {
        self.relevant
    }

    pub fn set_relevant(&mut self, relevant: bool) {
        self.relevant = relevant;
    }

    pub fn units(&self) -> Decimal {
        self.value(SecurityAttr::Units)
    }

    pub fn residual_cost(&self) -> Decimal {
        self.value(SecurityAttr::ResidualCost)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.values().get_date_value(SecurityAttr::StartDate)
    }

    pub fn invested(&self) -> Decimal {
        self.value(SecurityAttr::Invested)
    }

    pub fn foreign_invested(&self) -> Decimal {
        self.value(SecurityAttr::ForeignInvested)
    }

    /// Money put into the holding, negative when taken out. `foreign` is
    /// ignored for holdings priced in the reporting currency.
    pub fn adjust_invested(&mut self, local: Decimal, foreign: Decimal) {
        self.adjust(SecurityAttr::Invested, local);
        if self.foreign {
            self.adjust(SecurityAttr::ForeignInvested, foreign);
        }
    }

    /// Carry a start date over from the holding the units came from.
    pub fn set_start_date(&mut self, date: NaiveDate) {
        self.history
            .current_mut()
            .set_date(SecurityAttr::StartDate, date);
    }

    /// Add units, stamping the start date when the holding opens.
    pub fn add_units(&mut self, units: Decimal, date: NaiveDate) {
        if self.units().is_zero() && !units.is_zero() {
            self.history
                .current_mut()
                .set_date(SecurityAttr::StartDate, date);
        }
        self.adjust(SecurityAttr::Units, units);
    }

    /// Cost of `units` out of the units held, rounded to the reporting currency.
    /// Disposing of the whole holding takes the whole residual.
    pub fn cost_of_units(&self, units: Decimal) -> Decimal {
        let held = self.units();
        if held.is_zero() || units >= held {
            return self.residual_cost();
        }
        self.reporting.round(self.residual_cost() * units / held)
    }

    /// Market value in the reporting currency at `date`, without touching the bucket.
    pub fn market_value(
        &self,
        date: NaiveDate,
        prices: &dyn PriceLookup,
        rates: &dyn RateLookup,
    ) -> Result<Decimal> {
        let units = self.units();
        if units.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let price = prices.price_for_date(&self.holding.security, date)?;
        let rate = self.rate(date, rates)?;
        Ok(self.reporting.round(units * price * rate))
    }

    fn rate(&self, date: NaiveDate, rates: &dyn RateLookup) -> Result<Decimal> {
        if self.foreign {
            rates.rate_for_date(&self.currency, date)
        } else {
            Ok(Decimal::ONE)
        }
    }

    /// Price the holding at the start and end of `range` and derive the
    /// period's valuation delta, profit, market growth and, for foreign
    /// holdings, the split between local growth and currency fluctuation.
    pub fn analyse_bucket(
        &mut self,
        range: DateRange,
        prices: &dyn PriceLookup,
        rates: &dyn RateLookup,
    ) -> Result<()> {
        let security = self.holding.security.clone();
        let base_units = self.history.base().decimal(SecurityAttr::Units);
        let (base_foreign, base_valuation) = if base_units.is_zero() {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            let price = prices.price_for_date(&security, range.start)?;
            let rate = self.rate(range.start, rates)?;
            let foreign = self.currency.round(base_units * price);
            (foreign, self.reporting.round(base_units * price * rate))
        };

        let units = self.units();
        let (price, rate) = if units.is_zero() {
            (Decimal::ZERO, Decimal::ONE)
        } else {
            (
                prices.price_for_date(&security, range.end)?,
                self.rate(range.end, rates)?,
            )
        };
        let foreign_valuation = self.currency.round(units * price);
        let valuation = self.reporting.round(units * price * rate);

        let base = self.history.base();
        let current = self.history.current();
        let flow = |attr: SecurityAttr| current.decimal(attr) - base.decimal(attr);
        let invested = flow(SecurityAttr::Invested);
        let foreign_invested = flow(SecurityAttr::ForeignInvested);
        let dividend = flow(SecurityAttr::Dividend);
        let growth_adjust = flow(SecurityAttr::GrowthAdjust);
        let residual = current.decimal(SecurityAttr::ResidualCost);

        let value_delta = valuation - base_valuation;
        let profit = value_delta - invested + dividend + growth_adjust;
        let market_growth = profit - dividend;

        {
            let base = self.history.base_mut();
            base.set_decimal(SecurityAttr::Valuation, base_valuation);
            if self.foreign {
                base.set_decimal(SecurityAttr::ForeignValuation, base_foreign);
            }
        }

        let foreign = self.foreign;
        let reporting = self.reporting.clone();
        let values = self.history.current_mut();
        values.set_decimal(SecurityAttr::Price, price);
        values.set_decimal(SecurityAttr::Valuation, valuation);
        values.set_decimal(SecurityAttr::ValueDelta, value_delta);
        values.set_decimal(SecurityAttr::UnrealisedGains, valuation - residual);
        values.set_decimal(SecurityAttr::Profit, profit);
        values.set_decimal(SecurityAttr::MarketGrowth, market_growth);
        if foreign {
            let foreign_delta = foreign_valuation - base_foreign;
            let foreign_growth = foreign_delta - foreign_invested;
            let local_growth = reporting.round(foreign_growth * rate);
            values.set_decimal(SecurityAttr::ExchangeRate, rate);
            values.set_decimal(SecurityAttr::ForeignValuation, foreign_valuation);
            values.set_decimal(SecurityAttr::ForeignValueDelta, foreign_delta);
            values.set_decimal(SecurityAttr::ForeignMarketGrowth, foreign_growth);
            values.set_decimal(SecurityAttr::LocalMarketGrowth, local_growth);
            values.set_decimal(SecurityAttr::CurrencyFluct, market_growth - local_growth);
        } else {
            values.set_decimal(SecurityAttr::CurrencyFluct, Decimal::ZERO);
        }

        self.history.rebase();
        Ok(())
    }
}

impl Bucket for SecurityBucket {
    type Attr = SecurityAttr;

    fn history(&self) -> &BucketHistory<SecurityAttr> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut BucketHistory<SecurityAttr> {
        &mut self.history
    }
}
