use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{AccountBucket, AccountVariant, Bucket, SecurityBucket, TotalsBucket};
use crate::error::Result;
use crate::market_data::{PriceLookup, RateLookup};
use crate::models::{AssetRef, Currency, DateRange, HoldingId, Id, Portfolio, Security};
use crate::values::{AccountAttr, Attribute, BucketValues, PortfolioAttr, SecurityAttr};

/// A portfolio's cash account and security holdings.
#[derive(Debug, Clone)]
pub struct PortfolioBucket {
    id: Id,
    name: String,
    tax_free: bool,
    reporting: Currency,
    cash: AccountBucket,
    holdings: BTreeMap<Id, SecurityBucket>,
    values: BucketValues<PortfolioAttr>,
}

impl PortfolioBucket {
    pub fn new(portfolio: &Portfolio, reporting: &Currency) -> Self {
        let cash = AccountBucket::new(
            AssetRef::Portfolio(portfolio.id.clone()),
            portfolio.name.clone(),
            AccountVariant::PortfolioCash,
            portfolio.currency.clone(),
            reporting,
        )
        .closed(portfolio.closed);
        Self {
            id: portfolio.id.clone(),
            name: portfolio.name.clone(),
            tax_free: portfolio.tax_free,
            reporting: reporting.clone(),
            cash,
            holdings: BTreeMap::new(),
            values: BucketValues::allocated(PortfolioAttr::ALL),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_tax_free(&self) -> bool {
        self.tax_free
    }

    pub fn cash(&self) -> &AccountBucket {
        &self.cash
    }

    pub fn cash_mut(&mut self) -> &mut AccountBucket {
        &mut self.cash
    }

    pub fn holding(&self, security: &Id) -> Option<&SecurityBucket> {
        self.holdings.get(security)
    }

    pub fn holding_mut(&mut self, security: &Id) -> Option<&mut SecurityBucket> {
        self.holdings.get_mut(security)
    }

    /// The holding of `security`, created on first reference.
    pub fn holding_or_create(&mut self, security: &Security) -> &mut SecurityBucket {
        let reporting = &self.reporting;
        let portfolio = &self.id;
        self.holdings.entry(security.id.clone()).or_insert_with(|| {
            SecurityBucket::new(
                HoldingId::new(portfolio.clone(), security.id.clone()),
                security.name.clone(),
                security.class,
                security.currency.clone(),
                reporting,
            )
            .closed(security.closed)
        })
    }

    pub fn holdings(&self) -> impl Iterator<Item = &SecurityBucket> {
        self.holdings.values()
    }

    pub fn holdings_mut(&mut self) -> impl Iterator<Item = &mut SecurityBucket> {
        self.holdings.values_mut()
    }

    pub fn values(&self) -> &BucketValues<PortfolioAttr> {
        &self.values
    }

    pub fn value(&self, attr: PortfolioAttr) -> Decimal {
        self.values.decimal(attr)
    }

    pub fn is_idle(&self) -> bool {
        self.cash.is_idle() && self.holdings.values().all(|h| h.is_idle())
    }

    /// Active iff the cash account or any holding is.
    pub fn is_active(&self) -> bool {
        self.cash.is_active() || self.holdings.values().any(|h| h.is_active())
    }

    pub fn derive_as_of(&self, date: NaiveDate) -> Self {
        self.derive_with(|c| c.derive_as_of(date), |h| h.derive_as_of(date))
    }

    pub fn derive_for_range(&self, range: DateRange) -> Self {
        self.derive_with(|c| c.derive_for_range(range), |h| h.derive_for_range(range))
    }

    fn derive_with(
        &self,
        cash: impl Fn(&AccountBucket) -> AccountBucket,
        holding: impl Fn(&SecurityBucket) -> SecurityBucket,
    ) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            tax_free: self.tax_free,
            reporting: self.reporting.clone(),
            cash: cash(&self.cash),
            holdings: self
                .holdings
                .iter()
                .map(|(id, h)| (id.clone(), holding(h)))
                .collect(),
            values: BucketValues::allocated(PortfolioAttr::ALL),
        }
    }

    /// Period processing: cash fluctuation and delta, per-holding analysis,
    /// then the portfolio aggregates.
    pub fn analyse(
        &mut self,
        range: DateRange,
        prices: &dyn PriceLookup,
        rates: &dyn RateLookup,
    ) -> Result<()> {
        self.cash.calculate_fluctuations(range, rates)?;
        self.cash.calculate_delta();
        for holding in self.holdings.values_mut() {
            holding.analyse_bucket(range, prices, rates)?;
        }
        self.aggregate();
        Ok(())
    }

    /// Roll cash and holdings up into the portfolio's own attributes.
    pub fn aggregate(&mut self) {
        let mut values = BucketValues::allocated(PortfolioAttr::ALL);
        let cash = self.cash.values();
        values.set_decimal(PortfolioAttr::CashValue, cash.decimal(AccountAttr::Valuation));
        values.adjust(PortfolioAttr::ValueDelta, cash.decimal(AccountAttr::ValueDelta));
        values.adjust(PortfolioAttr::CurrencyFluct, cash.decimal(AccountAttr::CurrencyFluct));

        for holding in self.holdings.values() {
            let h = holding.values();
            for (from, to) in [
                (SecurityAttr::Valuation, PortfolioAttr::SecuritiesValue),
                (SecurityAttr::ResidualCost, PortfolioAttr::ResidualCost),
                (SecurityAttr::Invested, PortfolioAttr::Invested),
                (SecurityAttr::Dividend, PortfolioAttr::Dividend),
                (SecurityAttr::RealisedGains, PortfolioAttr::RealisedGains),
                (SecurityAttr::UnrealisedGains, PortfolioAttr::UnrealisedGains),
                (SecurityAttr::ValueDelta, PortfolioAttr::ValueDelta),
                (SecurityAttr::Profit, PortfolioAttr::Profit),
                (SecurityAttr::MarketGrowth, PortfolioAttr::MarketGrowth),
                (SecurityAttr::CurrencyFluct, PortfolioAttr::CurrencyFluct),
            ] {
                values.adjust(to, h.decimal(from));
            }
        }
        let valuation =
            values.decimal(PortfolioAttr::CashValue) + values.decimal(PortfolioAttr::SecuritiesValue);
        values.set_decimal(PortfolioAttr::Valuation, valuation);
        self.values = values;
    }

    /// Drop holdings that never traded in this view and hold nothing.
    pub fn prune(&mut self) {
        self.holdings.retain(|_, h| !h.is_prunable());
    }
}

/// All portfolios of an analysis.
#[derive(Debug, Clone, Default)]
pub struct PortfolioBucketList {
    portfolios: BTreeMap<Id, PortfolioBucket>,
    totals: TotalsBucket<PortfolioAttr>,
}

impl PortfolioBucketList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bucket: PortfolioBucket) {
        self.portfolios.insert(bucket.id.clone(), bucket);
    }

    pub fn get(&self, id: &Id) -> Option<&PortfolioBucket> {
        self.portfolios.get(id)
    }

    pub fn get_mut(&mut self, id: &Id) -> Option<&mut PortfolioBucket> {
        self.portfolios.get_mut(id)
    }

    pub fn holding(&self, holding: &HoldingId) -> Option<&SecurityBucket> {
        self.get(&holding.portfolio)?.holding(&holding.security)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortfolioBucket> {
        self.portfolios.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PortfolioBucket> {
        self.portfolios.values_mut()
    }

    pub fn len(&self) -> usize {
        self.portfolios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }

    pub fn totals(&self) -> &TotalsBucket<PortfolioAttr> {
        &self.totals
    }

    pub fn recompute_totals(&mut self) {
        let values = self.portfolios.values().map(|p| p.values());
        self.totals.recompute(values);
    }

    pub fn derive_as_of(&self, date: NaiveDate) -> Self {
        Self {
            portfolios: self
                .portfolios
                .iter()
                .map(|(id, p)| (id.clone(), p.derive_as_of(date)))
                .collect(),
            totals: TotalsBucket::default(),
        }
    }

    pub fn derive_for_range(&self, range: DateRange) -> Self {
        Self {
            portfolios: self
                .portfolios
                .iter()
                .map(|(id, p)| (id.clone(), p.derive_for_range(range)))
                .collect(),
            totals: TotalsBucket::default(),
        }
    }

    pub fn prune(&mut self) {
        for portfolio in self.portfolios.values_mut() {
            portfolio.prune();
        }
        self.portfolios
            .retain(|_, p| !(p.is_idle() && !p.is_active()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TransactionKey;
    use crate::market_data::MemoryMarketData;
    use crate::buckets::Movement;
    use crate::models::CategoryClass;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn portfolio_aggregates_cash_and_holdings() -> Result<()> {
        let gbp = Currency::new("GBP");
        let market = MemoryMarketData::new().with_price("acme", date(1), dec!(2));
        let mut bucket = PortfolioBucket::new(&Portfolio::new("isa", "GBP"), &gbp);
        let acme = Security::new("acme", "GBP", "acme-plc");

        let key = TransactionKey::new(0, date(1));
        let tx = Id::from("t0");
        bucket.cash_mut().adjust_for_credit(
            key,
            &tx,
            &Movement {
                amount: dec!(100),
                local: dec!(100),
                rate: Decimal::ONE,
                class: CategoryClass::Transfer,
            },
        )?;
        let holding = bucket.holding_or_create(&acme);
        holding.add_units(dec!(10), date(1));
        holding.adjust(SecurityAttr::ResidualCost, dec!(15));
        holding.adjust(SecurityAttr::Invested, dec!(15));
        holding.register(key, &tx)?;

        assert!(bucket.is_active());
        bucket.analyse(DateRange::new(date(1), date(31)), &market, &market)?;
        assert_eq!(bucket.value(PortfolioAttr::CashValue), dec!(100));
        assert_eq!(bucket.value(PortfolioAttr::SecuritiesValue), dec!(20));
        assert_eq!(bucket.value(PortfolioAttr::Valuation), dec!(120));
        assert_eq!(bucket.value(PortfolioAttr::Profit), dec!(5));
        Ok(())
    }

    #[test]
    fn dated_view_drops_later_holdings_on_prune() {
        let gbp = Currency::new("GBP");
        let mut list = PortfolioBucketList::new();
        let mut bucket = PortfolioBucket::new(&Portfolio::new("gia", "GBP"), &gbp);
        let holding = bucket.holding_or_create(&Security::new("acme", "GBP", "acme-plc"));
        holding.add_units(dec!(1), date(20));
        holding
            .register(TransactionKey::new(0, date(20)), &Id::from("t0"))
            .unwrap();
        list.insert(bucket);

        let mut dated = list.derive_as_of(date(10));
        dated.prune();
        assert!(dated.is_empty());
        assert_eq!(list.get(&Id::from("gia")).unwrap().holdings().count(), 1);
    }
}
