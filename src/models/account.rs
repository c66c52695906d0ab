use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Currency, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositClass {
    Checking,
    Savings,
    /// Interest is tax free (ISA-style wrapper).
    TaxFreeSavings,
    Bond,
    /// Peer-to-peer lending; losses are tracked as bad debt.
    PeerToPeer,
}

/// A bank or savings account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub id: Id,
    pub name: String,
    pub currency: Currency,
    pub class: DepositClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity: Option<NaiveDate>,
    #[serde(default)]
    pub closed: bool,
}

impl Deposit {
    pub fn new(id: impl Into<Id>, currency: impl Into<Currency>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            currency: currency.into(),
            class: DepositClass::Checking,
            opening_balance: None,
            maturity: None,
            closed: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_class(mut self, class: DepositClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = Some(balance);
        self
    }

    pub fn with_maturity(mut self, maturity: NaiveDate) -> Self {
        self.maturity = Some(maturity);
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }
}

/// Routes money moved into a cash account straight out to a payee and category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoExpense {
    pub payee: Id,
    pub category: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cash {
    pub id: Id,
    pub name: String,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_expense: Option<AutoExpense>,
    #[serde(default)]
    pub closed: bool,
}

impl Cash {
    pub fn new(id: impl Into<Id>, currency: impl Into<Currency>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            currency: currency.into(),
            opening_balance: None,
            auto_expense: None,
            closed: false,
        }
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = Some(balance);
        self
    }

    pub fn with_auto_expense(mut self, payee: impl Into<Id>, category: impl Into<Id>) -> Self {
        self.auto_expense = Some(AutoExpense {
            payee: payee.into(),
            category: category.into(),
        });
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanClass {
    CreditCard,
    Loan,
    PrivateLoan,
}

/// A liability. Its valuation is negative while money is owed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: Id,
    pub name: String,
    pub currency: Currency,
    pub class: LoanClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_balance: Option<Decimal>,
    #[serde(default)]
    pub closed: bool,
}

impl Loan {
    pub fn new(id: impl Into<Id>, currency: impl Into<Currency>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            currency: currency.into(),
            class: LoanClass::Loan,
            opening_balance: None,
            closed: false,
        }
    }

    pub fn with_class(mut self, class: LoanClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = Some(balance);
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Id,
    pub name: String,
    /// Currency of the portfolio's cash balance.
    pub currency: Currency,
    /// Income and gains inside the portfolio are tax free.
    #[serde(default)]
    pub tax_free: bool,
    #[serde(default)]
    pub closed: bool,
}

impl Portfolio {
    pub fn new(id: impl Into<Id>, currency: impl Into<Currency>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            currency: currency.into(),
            tax_free: false,
            closed: false,
        }
    }

    pub fn tax_free(mut self) -> Self {
        self.tax_free = true;
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityClass {
    Shares,
    UnitTrust,
    /// Life assurance bond; disposals produce chargeable gains.
    LifeBond,
    Property,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub id: Id,
    pub name: String,
    pub symbol: String,
    /// Currency the security is priced in.
    pub currency: Currency,
    pub class: SecurityClass,
    /// Payee that pays dividends and distributions.
    pub issuer: Id,
    #[serde(default)]
    pub closed: bool,
}

impl Security {
    pub fn new(
        id: impl Into<Id>,
        currency: impl Into<Currency>,
        issuer: impl Into<Id>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            symbol: id.to_string().to_uppercase(),
            id,
            currency: currency.into(),
            class: SecurityClass::Shares,
            issuer: issuer.into(),
            closed: false,
        }
    }

    pub fn with_class(mut self, class: SecurityClass) -> Self {
        self.class = class;
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayeeClass {
    /// The tax authority; receives tax credits and National Insurance.
    TaxMan,
    Employer,
    Institution,
    Individual,
    Market,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payee {
    pub id: Id,
    pub name: String,
    pub class: PayeeClass,
    #[serde(default)]
    pub closed: bool,
}

impl Payee {
    pub fn new(id: impl Into<Id>, class: PayeeClass) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            class,
            closed: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
