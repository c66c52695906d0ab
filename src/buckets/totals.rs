use rust_decimal::Decimal;

use crate::values::{Attribute, BucketValues};

/// Synthetic bucket holding the sum of a list's members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsBucket<A: Attribute> {
    values: BucketValues<A>,
}

impl<A: Attribute> Default for TotalsBucket<A> {
    fn default() -> Self {
        Self {
            values: BucketValues::allocated(A::ALL),
        }
    }
}

impl<A: Attribute> TotalsBucket<A> {
    /// Recompute from scratch over `members`.
    pub fn recompute<'a>(&mut self, members: impl IntoIterator<Item = &'a BucketValues<A>>) {
        self.values = BucketValues::allocated(A::ALL);
        for member in members {
            self.values.accumulate(member);
        }
    }

    pub fn values(&self) -> &BucketValues<A> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut BucketValues<A> {
        &mut self.values
    }

    pub fn value(&self, attr: A) -> Decimal {
        self.values.decimal(attr)
    }
}
