use std::cell::OnceCell;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::buckets::{
    slices_as_of, slices_for_range, AccountBucket, AccountBucketList, ChargeableGainSlice,
    DilutionEventMap, PayeeBucket, PayeeBucketList, PortfolioBucketList, SecurityBucket,
    TaxBasisBucket, TaxBasisBucketList, TransactionCategoryBucket, TransactionCategoryBucketList,
    TransactionTagBucket, TransactionTagBucketList,
};
use crate::market_data::{TaxAnalysis, TaxYear, TaxYearCalculator};
use crate::models::{AssetRef, Currency, DateRange, HoldingId, Id, TaxBasisClass};

/// Every bucket list for one view of a ledger.
///
/// The analyser builds a raw analysis in a single pass; dated and ranged
/// views are cut from it with [`Analysis::derive_as_of`] and
/// [`Analysis::derive_for_range`], which leave the source untouched.
#[derive(Debug, Clone)]
pub struct Analysis {
    currency: Currency,
    range: DateRange,
    pub(crate) accounts: AccountBucketList,
    pub(crate) portfolios: PortfolioBucketList,
    pub(crate) payees: PayeeBucketList,
    pub(crate) categories: TransactionCategoryBucketList,
    pub(crate) tax_bases: TaxBasisBucketList,
    pub(crate) tags: TransactionTagBucketList,
    pub(crate) dilutions: DilutionEventMap,
    pub(crate) chargeable_gains: Vec<ChargeableGainSlice>,
    tax_year: OnceCell<Option<Arc<dyn TaxYear>>>,
}

impl Analysis {
    pub fn new(currency: Currency, range: DateRange) -> Self {
        Self {
            currency,
            range,
            accounts: AccountBucketList::new(),
            portfolios: PortfolioBucketList::new(),
            payees: PayeeBucketList::new(),
            categories: TransactionCategoryBucketList::new(),
            tax_bases: TaxBasisBucketList::new(),
            tags: TransactionTagBucketList::new(),
            dilutions: DilutionEventMap::new(),
            chargeable_gains: Vec::new(),
            tax_year: OnceCell::new(),
        }
    }

    /// Reporting currency.
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub(crate) fn set_range(&mut self, range: DateRange) {
        self.range = range;
        self.tax_year = OnceCell::new();
    }

    pub fn accounts(&self) -> &AccountBucketList {
        &self.accounts
    }

    pub fn portfolios(&self) -> &PortfolioBucketList {
        &self.portfolios
    }

    pub fn payees(&self) -> &PayeeBucketList {
        &self.payees
    }

    pub fn categories(&self) -> &TransactionCategoryBucketList {
        &self.categories
    }

    pub fn tax_bases(&self) -> &TaxBasisBucketList {
        &self.tax_bases
    }

    pub fn tags(&self) -> &TransactionTagBucketList {
        &self.tags
    }

    pub fn dilutions(&self) -> &DilutionEventMap {
        &self.dilutions
    }

    pub fn chargeable_gains(&self) -> &[ChargeableGainSlice] {
        &self.chargeable_gains
    }

    /// A price quoted on `quoted` restated for the dilution events this view
    /// holds up to its end date, so it compares with current prices.
    pub fn diluted_price(&self, security: &Id, price: Decimal, quoted: NaiveDate) -> Decimal {
        self.dilutions
            .diluted_price(security, price, quoted, self.range.end)
    }

    /// Deposit, cash or loan bucket. Portfolio cash lives under [`Self::portfolios`].
    pub fn account(&self, asset: &AssetRef) -> Option<&AccountBucket> {
        match asset {
            AssetRef::Portfolio(id) => self.portfolios.get(id).map(|p| p.cash()),
            other => self.accounts.get(other),
        }
    }

    pub fn holding(&self, holding: &HoldingId) -> Option<&SecurityBucket> {
        self.portfolios.holding(holding)
    }

    pub fn payee(&self, id: &Id) -> Option<&PayeeBucket> {
        self.payees.get(id)
    }

    pub fn category(&self, id: &Id) -> Option<&TransactionCategoryBucket> {
        self.categories.get(id)
    }

    pub fn tax_basis(&self, class: TaxBasisClass) -> Option<&TaxBasisBucket> {
        self.tax_bases.get(class)
    }

    pub fn tag(&self, id: &Id) -> Option<&TransactionTagBucket> {
        self.tags.get(id)
    }

    /// View holding transactions dated on or before `date`.
    pub fn derive_as_of(&self, date: NaiveDate) -> Self {
        debug!(date = %date, "Deriving dated analysis");
        Self {
            currency: self.currency.clone(),
            range: self.range.truncated_to(date),
            accounts: self.accounts.derive_as_of(date),
            portfolios: self.portfolios.derive_as_of(date),
            payees: self.payees.derive_as_of(date),
            categories: self.categories.derive_as_of(date),
            tax_bases: self.tax_bases.derive_as_of(date),
            tags: self.tags.derive_as_of(date),
            dilutions: self.dilutions.as_of(date),
            chargeable_gains: slices_as_of(&self.chargeable_gains, date),
            tax_year: OnceCell::new(),
        }
    }

    /// View holding transactions inside `range`, based on the state before it.
    pub fn derive_for_range(&self, range: DateRange) -> Self {
        debug!(range = %range, "Deriving ranged analysis");
        Self {
            currency: self.currency.clone(),
            range,
            accounts: self.accounts.derive_for_range(range),
            portfolios: self.portfolios.derive_for_range(range),
            payees: self.payees.derive_for_range(range),
            categories: self.categories.derive_for_range(range),
            tax_bases: self.tax_bases.derive_for_range(range),
            tags: self.tags.derive_for_range(range),
            dilutions: self.dilutions.for_range(range),
            chargeable_gains: slices_for_range(&self.chargeable_gains, range),
            tax_year: OnceCell::new(),
        }
    }

    /// The tax year covering this view, looked up once.
    pub fn tax_year(&self, calculator: &dyn TaxYearCalculator) -> Option<Arc<dyn TaxYear>> {
        self.tax_year
            .get_or_init(|| calculator.find_tax_year_for_range(self.range))
            .clone()
    }

    pub fn tax_analysis(&self, calculator: &dyn TaxYearCalculator) -> Option<TaxAnalysis> {
        self.tax_year(calculator)
            .map(|year| year.analyse_tax_year(&self.tax_bases))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct FlatYear(DateRange);

    impl TaxYear for FlatYear {
        fn range(&self) -> DateRange {
            self.0
        }

        fn analyse_tax_year(&self, bases: &TaxBasisBucketList) -> TaxAnalysis {
            let taxable = bases.taxable_total();
            TaxAnalysis {
                year: self.0,
                taxable_income: taxable,
                tax_due: taxable / Decimal::from(5),
                tax_paid: Decimal::ZERO,
            }
        }
    }

    struct CountingCalculator(Cell<usize>);

    impl TaxYearCalculator for CountingCalculator {
        fn find_tax_year_for_range(&self, range: DateRange) -> Option<Arc<dyn TaxYear>> {
            self.0.set(self.0.get() + 1);
            Some(Arc::new(FlatYear(range)))
        }
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn tax_year_is_looked_up_once_per_view() {
        let analysis = Analysis::new(Currency::new("GBP"), DateRange::new(date(4, 6), date(12, 31)));
        let calculator = CountingCalculator(Cell::new(0));
        let first = analysis.tax_analysis(&calculator).unwrap();
        analysis.tax_analysis(&calculator).unwrap();
        assert_eq!(calculator.0.get(), 1);
        assert_eq!(first.balance(), Decimal::ZERO);

        let dated = analysis.derive_as_of(date(6, 30));
        assert_eq!(dated.range(), DateRange::new(date(4, 6), date(6, 30)));
        dated.tax_analysis(&calculator).unwrap();
        assert_eq!(calculator.0.get(), 2);
    }
}
