use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{Bucket, TotalsBucket};
use crate::error::Result;
use crate::history::BucketHistory;
use crate::models::{CategoryClass, Dataset, DateRange, Id, TransactionCategory};
use crate::values::{Attribute, BucketValues, CategoryAttr};

/// One transaction category.
///
/// The history holds amounts booked directly against the category; `totals`
/// adds every descendant's totals and is filled in by the list rollup.
#[derive(Debug, Clone)]
pub struct TransactionCategoryBucket {
    id: Id,
    full_name: String,
    class: CategoryClass,
    parent: Option<Id>,
    depth: usize,
    history: BucketHistory<CategoryAttr>,
    totals: BucketValues<CategoryAttr>,
}

impl TransactionCategoryBucket {
    pub fn new(category: &TransactionCategory, dataset: &Dataset) -> Result<Self> {
        Ok(Self {
            id: category.id.clone(),
            full_name: dataset.category_full_name(&category.id)?,
            class: category.class,
            parent: category.parent.clone(),
            depth: dataset.category_depth(&category.id)?,
            history: BucketHistory::new(BucketValues::allocated(CategoryAttr::ALL)),
            totals: BucketValues::allocated(CategoryAttr::ALL),
        })
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn class(&self) -> CategoryClass {
        self.class
    }

    pub fn parent(&self) -> Option<&Id> {
        self.parent.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Own amounts plus all descendants'.
    pub fn totals(&self) -> &BucketValues<CategoryAttr> {
        &self.totals
    }

    pub fn total(&self, attr: CategoryAttr) -> Decimal {
        self.totals.decimal(attr)
    }

    pub fn calculate_delta(&mut self) {
        self.history.rebase();
        set_profit(self.history.current_mut());
    }
}

fn set_profit(values: &mut BucketValues<CategoryAttr>) {
    let profit = values.decimal(CategoryAttr::Income) - values.decimal(CategoryAttr::Expense);
    values.set_decimal(CategoryAttr::Profit, profit);
}

impl Bucket for TransactionCategoryBucket {
    type Attr = CategoryAttr;

    fn history(&self) -> &BucketHistory<CategoryAttr> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut BucketHistory<CategoryAttr> {
        &mut self.history
    }

    fn is_active(&self) -> bool {
        self.values().is_active() || self.totals.is_active()
    }
}

/// Category buckets with hierarchical rollup.
#[derive(Debug, Clone, Default)]
pub struct TransactionCategoryBucketList {
    buckets: BTreeMap<Id, TransactionCategoryBucket>,
    order: Vec<Id>,
    totals: TotalsBucket<CategoryAttr>,
}

impl TransactionCategoryBucketList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Id) -> Option<&TransactionCategoryBucket> {
        self.buckets.get(id)
    }

    pub fn get_or_create(
        &mut self,
        category: &TransactionCategory,
        dataset: &Dataset,
    ) -> Result<&mut TransactionCategoryBucket> {
        match self.buckets.entry(category.id.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(TransactionCategoryBucket::new(category, dataset)?)),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets in category order (by full name) once rolled up.
    pub fn iter(&self) -> impl Iterator<Item = &TransactionCategoryBucket> {
        self.order.iter().filter_map(|id| self.buckets.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TransactionCategoryBucket> {
        self.buckets.values_mut()
    }

    pub fn totals(&self) -> &TotalsBucket<CategoryAttr> {
        &self.totals
    }

    pub fn derive_as_of(&self, date: NaiveDate) -> Self {
        self.derive_with(|b| b.derive_as_of(date))
    }

    pub fn derive_for_range(&self, range: DateRange) -> Self {
        self.derive_with(|b| b.derive_for_range(range))
    }

    fn derive_with(&self, derive: impl Fn(&TransactionCategoryBucket) -> TransactionCategoryBucket) -> Self {
        Self {
            buckets: self
                .buckets
                .iter()
                .map(|(id, b)| (id.clone(), derive(b)))
                .collect(),
            order: Vec::new(),
            totals: TotalsBucket::default(),
        }
    }

    /// Roll every category up through its parent chain.
    ///
    /// 1. create missing ancestors in a side map, then merge them in;
    /// 2. seed totals from own values and add children into parents, deepest first;
    /// 3. recompute profit, order by full name and total the roots.
    pub fn rollup(&mut self, dataset: &Dataset) -> Result<()> {
        let mut created = BTreeMap::new();
        for bucket in self.buckets.values() {
            let mut parent = bucket.parent.clone();
            while let Some(id) = parent {
                if self.buckets.contains_key(&id) || created.contains_key(&id) {
                    break;
                }
                let category = dataset.category(&id)?;
                created.insert(id.clone(), TransactionCategoryBucket::new(category, dataset)?);
                parent = category.parent.clone();
            }
        }
        self.buckets.extend(created);

        for bucket in self.buckets.values_mut() {
            bucket.totals = bucket.values().clone();
        }
        let mut by_depth: Vec<(usize, Id, Option<Id>)> = self
            .buckets
            .values()
            .map(|b| (b.depth, b.id.clone(), b.parent.clone()))
            .collect();
        by_depth.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, id, parent) in by_depth {
            let Some(parent) = parent else { continue };
            let Some(child) = self.buckets.get(&id).map(|b| b.totals.clone()) else {
                continue;
            };
            if let Some(parent) = self.buckets.get_mut(&parent) {
                parent.totals.accumulate(&child);
            }
        }

        for bucket in self.buckets.values_mut() {
            set_profit(&mut bucket.totals);
        }
        let mut order: Vec<(&str, &Id)> = self
            .buckets
            .values()
            .map(|b| (b.full_name.as_str(), &b.id))
            .collect();
        order.sort();
        self.order = order.into_iter().map(|(_, id)| id.clone()).collect();

        let roots = self
            .buckets
            .values()
            .filter(|b| b.parent.is_none())
            .map(|b| &b.totals);
        self.totals.recompute(roots);
        set_profit(self.totals.values_mut());
        Ok(())
    }

    pub fn prune(&mut self) {
        self.buckets.retain(|_, b| !b.is_prunable());
        let buckets = &self.buckets;
        self.order.retain(|id| buckets.contains_key(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TransactionKey;
    use rust_decimal_macros::dec;

    fn dataset() -> Dataset {
        Dataset::new()
            .with_category(TransactionCategory::new("income", CategoryClass::Parent).with_name("Income"))
            .with_category(
                TransactionCategory::new("work", CategoryClass::Parent)
                    .with_name("Work")
                    .with_parent("income"),
            )
            .with_category(
                TransactionCategory::new("salary", CategoryClass::TaxedIncome)
                    .with_name("Salary")
                    .with_parent("work"),
            )
            .with_category(
                TransactionCategory::new("bonus", CategoryClass::TaxedIncome)
                    .with_name("Bonus")
                    .with_parent("work"),
            )
            .with_category(
                TransactionCategory::new("interest", CategoryClass::Interest)
                    .with_name("Interest")
                    .with_parent("income"),
            )
            .with_category(TransactionCategory::new("food", CategoryClass::Expense).with_name("Food"))
    }

    fn book(
        list: &mut TransactionCategoryBucketList,
        data: &Dataset,
        id: &str,
        attr: CategoryAttr,
        amount: Decimal,
        seq: usize,
    ) {
        let category = data.category(&Id::from(id)).unwrap();
        let bucket = list.get_or_create(category, data).unwrap();
        bucket.adjust(attr, amount);
        bucket
            .register(
                TransactionKey::new(seq, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                &Id::from(format!("t{seq}")),
            )
            .unwrap();
    }

    #[test]
    fn parents_sum_children_at_every_depth() {
        let data = dataset();
        let mut list = TransactionCategoryBucketList::new();
        book(&mut list, &data, "salary", CategoryAttr::Income, dec!(1000), 0);
        book(&mut list, &data, "bonus", CategoryAttr::Income, dec!(200), 1);
        book(&mut list, &data, "interest", CategoryAttr::Income, dec!(15), 2);
        book(&mut list, &data, "food", CategoryAttr::Expense, dec!(80), 3);
        assert_eq!(list.len(), 4);

        list.rollup(&data).unwrap();
        assert_eq!(list.len(), 6);

        let work = list.get(&Id::from("work")).unwrap();
        assert_eq!(work.total(CategoryAttr::Income), dec!(1200));
        let income = list.get(&Id::from("income")).unwrap();
        assert_eq!(income.total(CategoryAttr::Income), dec!(1215));
        assert_eq!(list.totals().value(CategoryAttr::Income), dec!(1215));
        assert_eq!(list.totals().value(CategoryAttr::Expense), dec!(80));
        assert_eq!(list.totals().value(CategoryAttr::Profit), dec!(1135));

        let names: Vec<&str> = list.iter().map(|b| b.full_name()).collect();
        assert_eq!(
            names,
            vec![
                "Food",
                "Income",
                "Income:Interest",
                "Income:Work",
                "Income:Work:Bonus",
                "Income:Work:Salary"
            ]
        );

        // Created parents hold totals, so pruning keeps them.
        list.prune();
        assert_eq!(list.len(), 6);
    }

    #[test]
    fn rollup_is_repeatable() {
        let data = dataset();
        let mut list = TransactionCategoryBucketList::new();
        book(&mut list, &data, "salary", CategoryAttr::Income, dec!(10), 0);
        list.rollup(&data).unwrap();
        list.rollup(&data).unwrap();
        assert_eq!(
            list.get(&Id::from("income")).unwrap().total(CategoryAttr::Income),
            dec!(10)
        );
    }
}
