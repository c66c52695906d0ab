use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::Bucket;
use crate::error::Result;
use crate::history::{BucketHistory, TransactionKey};
use crate::market_data::RateLookup;
use crate::models::{AssetRef, CategoryClass, Currency, DateRange, DepositClass, Id, LoanClass};
use crate::values::{AccountAttr, BucketValues};

/// Which concrete account an [`AccountBucket`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountVariant {
    Deposit(DepositClass),
    Cash { auto_expense: bool },
    Loan(LoanClass),
    /// Uninvested cash inside a portfolio.
    PortfolioCash,
}

impl AccountVariant {
    pub fn kind_name(self) -> &'static str {
        match self {
            AccountVariant::Deposit(_) => "deposit",
            AccountVariant::Cash { .. } => "cash",
            AccountVariant::Loan(_) => "loan",
            AccountVariant::PortfolioCash => "portfolio",
        }
    }

    fn tracks_spend(self) -> bool {
        matches!(self, AccountVariant::Cash { .. } | AccountVariant::Loan(_))
    }

    fn tracks_bad_debt(self) -> bool {
        self == AccountVariant::Deposit(DepositClass::PeerToPeer)
    }

    pub fn is_auto_expense(self) -> bool {
        self == AccountVariant::Cash { auto_expense: true }
    }
}

/// Money moving in or out of one account for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    /// In the account's currency.
    pub amount: Decimal,
    /// In the reporting currency.
    pub local: Decimal,
    /// Account currency to reporting currency on the transaction date.
    pub rate: Decimal,
    pub class: CategoryClass,
}

#[derive(Debug, Clone)]
pub struct AccountBucket {
    asset: AssetRef,
    name: String,
    variant: AccountVariant,
    currency: Currency,
    reporting: Currency,
    foreign: bool,
    closed: bool,
    relevant: bool,
    history: BucketHistory<AccountAttr>,
}

impl AccountBucket {
    pub fn new(
        asset: AssetRef,
        name: impl Into<String>,
        variant: AccountVariant,
        currency: Currency,
        reporting: &Currency,
    ) -> Self {
        let foreign = currency != *reporting;
        Self {
            history: BucketHistory::new(Self::allocate_values(variant, foreign)),
            asset,
            name: name.into(),
            variant,
            currency,
            reporting: reporting.clone(),
            foreign,
            closed: false,
            relevant: false,
        }
    }

    /// Slots guaranteed present for an account of this shape.
    pub fn allocate_values(variant: AccountVariant, foreign: bool) -> BucketValues<AccountAttr> {
        let mut attrs = vec![AccountAttr::Valuation, AccountAttr::ValueDelta];
        if foreign {
            attrs.extend([
                AccountAttr::ForeignValue,
                AccountAttr::LocalValue,
                AccountAttr::ExchangeRate,
                AccountAttr::CurrencyFluct,
            ]);
        }
        if variant.tracks_spend() {
            attrs.push(AccountAttr::Spend);
        }
        if variant.tracks_bad_debt() {
            attrs.extend([AccountAttr::BadDebtCapital, AccountAttr::BadDebtInterest]);
        }
        BucketValues::allocated(&attrs)
    }

    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    /// Seed base and current with a balance held before the first transaction.
    ///
    /// `rate` converts the balance into the reporting currency.
    pub fn with_opening_balance(self, balance: Decimal, rate: Decimal) -> Self {
        let reporting = self.reporting.clone();
        let foreign = self.foreign;
        self.with_initial(|values| {
            if foreign {
                let local = reporting.round(balance * rate);
                values.set_decimal(AccountAttr::ForeignValue, balance);
                values.set_decimal(AccountAttr::LocalValue, local);
                values.set_decimal(AccountAttr::Valuation, local);
                values.set_decimal(AccountAttr::ExchangeRate, rate);
            } else {
                values.set_decimal(AccountAttr::Valuation, balance);
            }
        })
    }

    pub fn with_maturity(self, maturity: NaiveDate) -> Self {
        self.with_initial(|values| values.set_date(AccountAttr::Maturity, maturity))
    }

    fn with_initial(mut self, apply: impl FnOnce(&mut BucketValues<AccountAttr>)) -> Self {
        debug_assert!(self.history.is_idle(), "initial values set after transactions");
        let mut initial = self.history.current().clone();
        apply(&mut initial);
        self.history = BucketHistory::new(initial);
        self
    }

    pub fn asset(&self) -> &AssetRef {
        &self.asset
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> AccountVariant {
        self.variant
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

    pub fn valuation(&self) -> Decimal {
        self.value(AccountAttr::Valuation)
    }

    /// Money leaves the account.
    pub fn adjust_for_debit(
        &mut self,
        key: TransactionKey,
        transaction: &Id,
        movement: &Movement,
    ) -> Result<()> {
        self.apply(-movement.amount, -movement.local, movement.rate);
        if movement.class.is_expense() && self.variant.tracks_spend() {
            self.adjust(AccountAttr::Spend, movement.local);
        }
        self.adjust_bad_debt(movement.class, movement.local);
        self.register(key, transaction)
    }

    /// Money arrives in the account.
    pub fn adjust_for_credit(
        &mut self,
        key: TransactionKey,
        transaction: &Id,
        movement: &Movement,
    ) -> Result<()> {
        self.apply(movement.amount, movement.local, movement.rate);
        if movement.class.is_expense() && self.variant.tracks_spend() {
            self.adjust(AccountAttr::Spend, -movement.local);
        }
        // A recovered bad debt reverses the write-off.
        self.adjust_bad_debt(movement.class, -movement.local);
        self.register(key, transaction)
    }

    /// Spending routed through the account without changing its balance.
    pub fn record_spend(&mut self, key: TransactionKey, transaction: &Id, local: Decimal) -> Result<()> {
        if self.variant.tracks_spend() {
            self.adjust(AccountAttr::Spend, local);
        }
        self.register(key, transaction)
    }

    fn adjust_bad_debt(&mut self, class: CategoryClass, local: Decimal) {
        if !self.variant.tracks_bad_debt() {
            return;
        }
        match class {
            CategoryClass::BadDebtCapital => self.adjust(AccountAttr::BadDebtCapital, local),
            CategoryClass::BadDebtInterest => self.adjust(AccountAttr::BadDebtInterest, local),
            _ => {}
        }
    }

    fn apply(&mut self, amount: Decimal, local: Decimal, rate: Decimal) {
        let reporting = &self.reporting;
        let values = self.history.current_mut();
        if self.foreign {
            values.adjust(AccountAttr::ForeignValue, amount);
            values.adjust(AccountAttr::LocalValue, local);
            values.set_decimal(AccountAttr::ExchangeRate, rate);
            let foreign_value = values.decimal(AccountAttr::ForeignValue);
            values.set_decimal(AccountAttr::Valuation, reporting.round(foreign_value * rate));
        } else {
            values.adjust(AccountAttr::Valuation, amount);
        }
    }

    /// Revalue base and current foreign balances at the range's start and end
    /// rates and record the movement not explained by flows.
    pub fn calculate_fluctuations(&mut self, range: DateRange, rates: &dyn RateLookup) -> Result<()> {
        if !self.foreign {
            return Ok(());
        }
        let base_foreign = self.history.base().decimal(AccountAttr::ForeignValue);
        let base_valuation = if base_foreign.is_zero() {
            Decimal::ZERO
        } else {
            let rate = rates.rate_for_date(&self.currency, range.start)?;
            self.reporting.round(base_foreign * rate)
        };

        let current_foreign = self.history.current().decimal(AccountAttr::ForeignValue);
        let end_rate = if current_foreign.is_zero() {
            None
        } else {
            Some(rates.rate_for_date(&self.currency, range.end)?)
        };
        let current_valuation = end_rate
            .map(|rate| self.reporting.round(current_foreign * rate))
            .unwrap_or(Decimal::ZERO);

        let book_movement = self.history.current().decimal(AccountAttr::LocalValue)
            - self.history.base().decimal(AccountAttr::LocalValue);
        let fluctuation = (current_valuation - base_valuation) - book_movement;

        self.history
            .base_mut()
            .set_decimal(AccountAttr::Valuation, base_valuation);
        let current = self.history.current_mut();
        current.set_decimal(AccountAttr::Valuation, current_valuation);
        if let Some(rate) = end_rate {
            current.set_decimal(AccountAttr::ExchangeRate, rate);
        }
        current.set_decimal(AccountAttr::CurrencyFluct, fluctuation);
        Ok(())
    }

    /// Value over the period, then rebase so a repeat call sees the same figure.
    pub fn calculate_delta(&mut self) -> Decimal {
        let delta = self.history.current().decimal(AccountAttr::Valuation)
            - self.history.base().decimal(AccountAttr::Valuation);
        self.history
            .current_mut()
            .set_decimal(AccountAttr::ValueDelta, delta);
        self.history.rebase();
        delta
    }
}

impl Bucket for AccountBucket {
    type Attr = AccountAttr;

    fn history(&self) -> &BucketHistory<AccountAttr> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut BucketHistory<AccountAttr> {
        &mut self.history
    }
}
