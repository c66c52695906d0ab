use rust_decimal::Decimal;

use super::{Bucket, BucketList};
use crate::history::{BucketHistory, TransactionKey};
use crate::error::Result;
use crate::models::{Id, TransactionTag};
use crate::values::{Attribute, BucketValues, TagAttr};

/// Income and expense booked by transactions carrying one tag.
#[derive(Debug, Clone)]
pub struct TransactionTagBucket {
    id: Id,
    name: String,
    history: BucketHistory<TagAttr>,
}

impl TransactionTagBucket {
    pub fn new(tag: &TransactionTag) -> Self {
        Self {
            id: tag.id.clone(),
            name: tag.name.clone(),
            history: BucketHistory::new(BucketValues::allocated(TagAttr::ALL)),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> Decimal {
        self.value(TagAttr::Count)
    }

    /// Count the transaction once, whatever it booked.
    pub fn book(
        &mut self,
        key: TransactionKey,
        transaction: &Id,
        income: Decimal,
        expense: Decimal,
    ) -> Result<()> {
        self.adjust(TagAttr::Count, Decimal::ONE);
        self.adjust(TagAttr::Income, income);
        self.adjust(TagAttr::Expense, expense);
        self.register(key, transaction)
    }

    pub fn calculate_delta(&mut self) {
        self.history.rebase();
    }
}

impl Bucket for TransactionTagBucket {
    type Attr = TagAttr;

    fn history(&self) -> &BucketHistory<TagAttr> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut BucketHistory<TagAttr> {
        &mut self.history
    }
}

pub type TransactionTagBucketList = BucketList<Id, TransactionTagBucket>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::models::DateRange;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    #[test]
    fn count_is_a_period_flow() -> Result<()> {
        let mut list = TransactionTagBucketList::new();
        let tag = TransactionTag::new("holiday");
        for (seq, day) in [(0, 2), (1, 12), (2, 20)] {
            list.get_or_create(&tag.id, || TransactionTagBucket::new(&tag)).book(
                TransactionKey::new(seq, date(day)),
                &Id::from(format!("t{seq}")),
                Decimal::ZERO,
                dec!(40),
            )?;
        }
        assert_eq!(list.get(&tag.id).unwrap().count(), dec!(3));

        let mut ranged = list.derive_for_range(DateRange::new(date(10), date(31)));
        for bucket in ranged.buckets_mut() {
            bucket.calculate_delta();
        }
        ranged.recompute_totals();
        let holiday = ranged.get(&tag.id).unwrap();
        assert_eq!(holiday.count(), dec!(2));
        assert_eq!(holiday.value(TagAttr::Expense), dec!(80));
        assert_eq!(ranged.totals().value(TagAttr::Count), dec!(2));
        Ok(())
    }
}
