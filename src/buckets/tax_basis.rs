use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{Bucket, TotalsBucket};
use crate::error::Result;
use crate::history::{BucketHistory, TransactionKey};
use crate::models::{AssetRef, DateRange, Id, TaxBasisClass};
use crate::values::{Attribute, BucketValues, TaxBasisAttr};

/// Gross, nett and tax-credit amounts booked against one tax basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxAmounts {
    pub gross: Decimal,
    pub nett: Decimal,
    pub tax_credit: Decimal,
}

impl TaxAmounts {
    /// Income paid without deductions.
    pub fn untaxed(amount: Decimal) -> Self {
        Self {
            gross: amount,
            nett: amount,
            tax_credit: Decimal::ZERO,
        }
    }

    pub fn negated(self) -> Self {
        Self {
            gross: -self.gross,
            nett: -self.nett,
            tax_credit: -self.tax_credit,
        }
    }

    fn apply(&self, values: &mut BucketValues<TaxBasisAttr>) {
        values.adjust(TaxBasisAttr::Gross, self.gross);
        values.adjust(TaxBasisAttr::Nett, self.nett);
        values.adjust(TaxBasisAttr::TaxCredit, self.tax_credit);
    }
}

/// One tax basis' amounts arising in one account.
#[derive(Debug, Clone)]
pub struct TaxBasisAccountBucket {
    account: AssetRef,
    history: BucketHistory<TaxBasisAttr>,
}

impl TaxBasisAccountBucket {
    fn new(account: AssetRef) -> Self {
        Self {
            account,
            history: BucketHistory::new(BucketValues::allocated(TaxBasisAttr::ALL)),
        }
    }

    pub fn account(&self) -> &AssetRef {
        &self.account
    }
}

impl Bucket for TaxBasisAccountBucket {
    type Attr = TaxBasisAttr;

    fn history(&self) -> &BucketHistory<TaxBasisAttr> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut BucketHistory<TaxBasisAttr> {
        &mut self.history
    }
}

#[derive(Debug, Clone)]
pub struct TaxBasisBucket {
    class: TaxBasisClass,
    history: BucketHistory<TaxBasisAttr>,
    accounts: BTreeMap<AssetRef, TaxBasisAccountBucket>,
}

impl TaxBasisBucket {
    pub fn new(class: TaxBasisClass) -> Self {
        Self {
            class,
            history: BucketHistory::new(BucketValues::allocated(TaxBasisAttr::ALL)),
            accounts: BTreeMap::new(),
        }
    }

    pub fn class(&self) -> TaxBasisClass {
        self.class
    }

    pub fn account(&self, account: &AssetRef) -> Option<&TaxBasisAccountBucket> {
        self.accounts.get(account)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &TaxBasisAccountBucket> {
        self.accounts.values()
    }

    /// Sum of the per-account sub-buckets.
    pub fn accounts_total(&self) -> BucketValues<TaxBasisAttr> {
        let mut total = BucketValues::allocated(TaxBasisAttr::ALL);
        for account in self.accounts.values() {
            total.accumulate(account.values());
        }
        total
    }

    fn book(
        &mut self,
        account: &AssetRef,
        amounts: TaxAmounts,
        key: TransactionKey,
        transaction: &Id,
    ) -> Result<()> {
        amounts.apply(self.history.current_mut());
        self.register(key, transaction)?;
        let sub = self
            .accounts
            .entry(account.clone())
            .or_insert_with(|| TaxBasisAccountBucket::new(account.clone()));
        amounts.apply(sub.history.current_mut());
        sub.register(key, transaction)
    }

    fn calculate_delta(&mut self) {
        self.history.rebase();
        for account in self.accounts.values_mut() {
            account.history.rebase();
        }
    }

    fn derive_with(
        &self,
        derive: impl Fn(&BucketHistory<TaxBasisAttr>) -> BucketHistory<TaxBasisAttr>,
    ) -> Self {
        Self {
            class: self.class,
            history: derive(&self.history),
            accounts: self
                .accounts
                .iter()
                .map(|(asset, sub)| {
                    (
                        asset.clone(),
                        TaxBasisAccountBucket {
                            account: sub.account.clone(),
                            history: derive(&sub.history),
                        },
                    )
                })
                .collect(),
        }
    }
}

impl Bucket for TaxBasisBucket {
    type Attr = TaxBasisAttr;

    fn history(&self) -> &BucketHistory<TaxBasisAttr> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut BucketHistory<TaxBasisAttr> {
        &mut self.history
    }

    fn derive_as_of(&self, date: NaiveDate) -> Self {
        self.derive_with(|h| h.as_of(date))
    }

    fn derive_for_range(&self, range: DateRange) -> Self {
        self.derive_with(|h| h.for_range(range))
    }
}

/// Tax bases of an analysis, in reporting order.
#[derive(Debug, Clone, Default)]
pub struct TaxBasisBucketList {
    buckets: BTreeMap<TaxBasisClass, TaxBasisBucket>,
    totals: TotalsBucket<TaxBasisAttr>,
}

impl TaxBasisBucketList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class: TaxBasisClass) -> Option<&TaxBasisBucket> {
        self.buckets.get(&class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxBasisBucket> {
        self.buckets.values()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Book `amounts` against `class`, and against the account's sub-bucket.
    pub fn book(
        &mut self,
        class: TaxBasisClass,
        account: &AssetRef,
        amounts: TaxAmounts,
        key: TransactionKey,
        transaction: &Id,
    ) -> Result<()> {
        self.buckets
            .entry(class)
            .or_insert_with(|| TaxBasisBucket::new(class))
            .book(account, amounts, key, transaction)
    }

    /// Amount booked outside any transaction, such as virtual market growth.
    pub fn adjust_untracked(&mut self, class: TaxBasisClass, amounts: TaxAmounts) {
        let bucket = self
            .buckets
            .entry(class)
            .or_insert_with(|| TaxBasisBucket::new(class));
        amounts.apply(bucket.history.current_mut());
    }

    pub fn totals(&self) -> &TotalsBucket<TaxBasisAttr> {
        &self.totals
    }

    /// Income bases less expense bases, by gross amount.
    pub fn taxable_total(&self) -> Decimal {
        self.buckets
            .values()
            .filter(|b| b.class != TaxBasisClass::Virtual)
            .map(|b| {
                let gross = b.value(TaxBasisAttr::Gross);
                if b.class.is_expense() {
                    -gross
                } else {
                    gross
                }
            })
            .sum()
    }

    /// Rebase every basis and its account sub-buckets, then total.
    pub fn rollup(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.calculate_delta();
        }
        let values = self.buckets.values().map(|b| b.values());
        self.totals.recompute(values);
    }

    pub fn derive_as_of(&self, date: NaiveDate) -> Self {
        Self {
            buckets: self
                .buckets
                .iter()
                .map(|(c, b)| (*c, b.derive_as_of(date)))
                .collect(),
            totals: TotalsBucket::default(),
        }
    }

    pub fn derive_for_range(&self, range: DateRange) -> Self {
        Self {
            buckets: self
                .buckets
                .iter()
                .map(|(c, b)| (*c, b.derive_for_range(range)))
                .collect(),
            totals: TotalsBucket::default(),
        }
    }

    pub fn prune(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.accounts.retain(|_, a| !a.is_prunable());
        }
        self.buckets.retain(|_, b| !b.is_prunable());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key(seq: usize, day: u32) -> TransactionKey {
        TransactionKey::new(seq, NaiveDate::from_ymd_opt(2024, 4, day).unwrap())
    }

    #[test]
    fn basis_equals_sum_of_account_sub_buckets() -> Result<()> {
        let mut list = TaxBasisBucketList::new();
        let bank = AssetRef::deposit("bank");
        let isa = AssetRef::portfolio("isa");
        list.book(
            TaxBasisClass::Salary,
            &bank,
            TaxAmounts {
                gross: dec!(1300),
                nett: dec!(1000),
                tax_credit: dec!(300),
            },
            key(0, 6),
            &Id::from("t0"),
        )?;
        list.book(
            TaxBasisClass::Interest,
            &bank,
            TaxAmounts::untaxed(dec!(12)),
            key(1, 7),
            &Id::from("t1"),
        )?;
        list.book(
            TaxBasisClass::Interest,
            &isa,
            TaxAmounts::untaxed(dec!(8)),
            key(2, 8),
            &Id::from("t2"),
        )?;
        list.book(
            TaxBasisClass::Expense,
            &bank,
            TaxAmounts::untaxed(dec!(100)),
            key(3, 9),
            &Id::from("t3"),
        )?;
        list.rollup();

        let interest = list.get(TaxBasisClass::Interest).unwrap();
        assert_eq!(interest.values(), &interest.accounts_total());
        assert_eq!(interest.value(TaxBasisAttr::Gross), dec!(20));
        assert_eq!(interest.accounts().count(), 2);
        assert_eq!(list.totals().value(TaxBasisAttr::TaxCredit), dec!(300));
        assert_eq!(list.taxable_total(), dec!(1220));
        Ok(())
    }

    #[test]
    fn ranged_view_measures_from_range_start() -> Result<()> {
        let mut list = TaxBasisBucketList::new();
        let bank = AssetRef::deposit("bank");
        for (seq, day) in [(0, 1), (1, 15)] {
            list.book(
                TaxBasisClass::Dividend,
                &bank,
                TaxAmounts::untaxed(dec!(50)),
                key(seq, day),
                &Id::from(format!("t{seq}")),
            )?;
        }
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        );
        let mut ranged = list.derive_for_range(range);
        ranged.rollup();
        let dividend = ranged.get(TaxBasisClass::Dividend).unwrap();
        assert_eq!(dividend.value(TaxBasisAttr::Gross), dec!(50));
        assert_eq!(
            dividend.account(&bank).unwrap().value(TaxBasisAttr::Gross),
            dec!(50)
        );
        Ok(())
    }
}
