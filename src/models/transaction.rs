use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AssetRef, Id};

/// Which way money moves between a transaction's account and its partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Money leaves the account for the partner.
    #[default]
    To,
    /// Money arrives in the account from the partner.
    From,
}

/// Cash paid out alongside a corporate action (e.g. the cash leg of a takeover).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedCash {
    /// Account that receives the cash.
    pub account: AssetRef,
    /// Amount in the transaction account's currency.
    pub amount: Decimal,
    /// Amount in the receiving account's currency, when that differs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_amount: Option<Decimal>,
}

/// An immutable ledger entry.
///
/// `amount` is in the currency of `account`; `partner_amount`, when present, is
/// the same value in the partner's currency. The optional tax fields are in the
/// account's currency too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Id,
    pub date: NaiveDate,
    pub account: AssetRef,
    pub partner: AssetRef,
    #[serde(default)]
    pub direction: Direction,
    pub category: Id,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_credit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_insurance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deemed_benefit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withheld: Option<Decimal>,
    /// Signed change in units of the account side, when it is a holding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_delta_units: Option<Decimal>,
    /// Signed change in units of the partner side, when it is a holding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_delta_units: Option<Decimal>,
    /// Fraction of the original holding's value that remains after the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dilution: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_cash: Option<ReturnedCash>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Id>,
    #[serde(default)]
    pub deleted: bool,
}

impl Transaction {
    /// A transaction moving `amount` from `account` to `partner`.
    pub fn new(
        date: NaiveDate,
        account: AssetRef,
        partner: AssetRef,
        category: impl Into<Id>,
        amount: Decimal,
    ) -> Self {
        Self {
            id: Id::new(),
            date,
            account,
            partner,
            direction: Direction::To,
            category: category.into(),
            amount,
            partner_amount: None,
            tax_credit: None,
            nat_insurance: None,
            deemed_benefit: None,
            withheld: None,
            account_delta_units: None,
            partner_delta_units: None,
            dilution: None,
            returned_cash: None,
            tags: Vec::new(),
            deleted: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_partner_amount(mut self, amount: Decimal) -> Self {
        self.partner_amount = Some(amount);
        self
    }

    pub fn with_tax_credit(mut self, amount: Decimal) -> Self {
        self.tax_credit = Some(amount);
        self
    }

    pub fn with_nat_insurance(mut self, amount: Decimal) -> Self {
        self.nat_insurance = Some(amount);
        self
    }

    pub fn with_deemed_benefit(mut self, amount: Decimal) -> Self {
        self.deemed_benefit = Some(amount);
        self
    }

    pub fn with_withheld(mut self, amount: Decimal) -> Self {
        self.withheld = Some(amount);
        self
    }

    pub fn with_account_units(mut self, units: Decimal) -> Self {
        self.account_delta_units = Some(units);
        self
    }

    pub fn with_partner_units(mut self, units: Decimal) -> Self {
        self.partner_delta_units = Some(units);
        self
    }

    pub fn with_dilution(mut self, dilution: Decimal) -> Self {
        self.dilution = Some(dilution);
        self
    }

    pub fn with_returned_cash(mut self, account: AssetRef, amount: Decimal) -> Self {
        self.returned_cash = Some(ReturnedCash {
            account,
            amount,
            partner_amount: None,
        });
        self
    }

    pub fn with_tag(mut self, tag: impl Into<Id>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// The side money leaves.
    pub fn debit(&self) -> &AssetRef {
        match self.direction {
            Direction::To => &self.account,
            Direction::From => &self.partner,
        }
    }

    /// The side money arrives at.
    pub fn credit(&self) -> &AssetRef {
        match self.direction {
            Direction::To => &self.partner,
            Direction::From => &self.account,
        }
    }
}
