use rust_decimal::Decimal;

use super::{Bucket, BucketList};
use crate::history::BucketHistory;
use crate::models::{Id, Payee, PayeeClass};
use crate::values::{Attribute, BucketValues, PayeeAttr};

#[derive(Debug, Clone)]
pub struct PayeeBucket {
    id: Id,
    name: String,
    class: PayeeClass,
    closed: bool,
    history: BucketHistory<PayeeAttr>,
}

impl PayeeBucket {
    pub fn new(payee: &Payee) -> Self {
        Self {
            id: payee.id.clone(),
            name: payee.name.clone(),
            class: payee.class,
            closed: payee.closed,
            history: BucketHistory::new(BucketValues::allocated(PayeeAttr::ALL)),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> PayeeClass {
        self.class
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn income(&self) -> Decimal {
        self.value(PayeeAttr::Income)
    }

    pub fn expense(&self) -> Decimal {
        self.value(PayeeAttr::Expense)
    }

    pub fn calculate_delta(&mut self) {
        self.history.rebase();
        let values = self.history.current_mut();
        let profit = values.decimal(PayeeAttr::Income) - values.decimal(PayeeAttr::Expense);
        values.set_decimal(PayeeAttr::Profit, profit);
    }
}

impl Bucket for PayeeBucket {
    type Attr = PayeeAttr;

    fn history(&self) -> &BucketHistory<PayeeAttr> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut BucketHistory<PayeeAttr> {
        &mut self.history
    }
}

pub type PayeeBucketList = BucketList<Id, PayeeBucket>;
