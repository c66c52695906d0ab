use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::history::{BucketHistory, TransactionKey};
use crate::models::{DateRange, Id};
use crate::values::{Attribute, BucketValues};

/// A value container backed by a snapshot history.
pub trait Bucket: Clone {
    type Attr: Attribute;

    fn history(&self) -> &BucketHistory<Self::Attr>;

    fn history_mut(&mut self) -> &mut BucketHistory<Self::Attr>;

    fn values(&self) -> &BucketValues<Self::Attr> {
        self.history().current()
    }

    fn value(&self, attr: Self::Attr) -> Decimal {
        self.values().decimal(attr)
    }

    fn adjust(&mut self, attr: Self::Attr, delta: Decimal) {
        self.history_mut().current_mut().adjust(attr, delta);
    }

    fn register(&mut self, key: TransactionKey, transaction: &Id) -> Result<()> {
        self.history_mut().register_transaction(key, transaction)
    }

    fn is_idle(&self) -> bool {
        self.history().is_idle()
    }

    fn is_active(&self) -> bool {
        self.values().is_active()
    }

    /// Idle and inactive buckets carry nothing worth reporting.
    fn is_prunable(&self) -> bool {
        self.is_idle() && !self.is_active()
    }

    fn derive_as_of(&self, date: NaiveDate) -> Self {
        let mut copy = self.clone();
        *copy.history_mut() = self.history().as_of(date);
        copy
    }

    fn derive_for_range(&self, range: DateRange) -> Self {
        let mut copy = self.clone();
        *copy.history_mut() = self.history().for_range(range);
        copy
    }
}
