use serde::{Deserialize, Serialize};

/// Tax treatment of an amount. Declaration order is reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBasisClass {
    Salary,
    RoomRental,
    Rental,
    Interest,
    Dividend,
    UnitTrustDividend,
    TaxFree,
    TaxPaid,
    Market,
    CapitalGains,
    ChargeableGains,
    Virtual,
    BadDebtCapital,
    BadDebtInterest,
    Expense,
}

impl TaxBasisClass {
    pub const ALL: &'static [TaxBasisClass] = &[
        TaxBasisClass::Salary,
        TaxBasisClass::RoomRental,
        TaxBasisClass::Rental,
        TaxBasisClass::Interest,
        TaxBasisClass::Dividend,
        TaxBasisClass::UnitTrustDividend,
        TaxBasisClass::TaxFree,
        TaxBasisClass::TaxPaid,
        TaxBasisClass::Market,
        TaxBasisClass::CapitalGains,
        TaxBasisClass::ChargeableGains,
        TaxBasisClass::Virtual,
        TaxBasisClass::BadDebtCapital,
        TaxBasisClass::BadDebtInterest,
        TaxBasisClass::Expense,
    ];

    /// Bases that reduce the taxable total rather than add to it.
    pub fn is_expense(self) -> bool {
        matches!(
            self,
            TaxBasisClass::TaxPaid
                | TaxBasisClass::BadDebtCapital
                | TaxBasisClass::BadDebtInterest
                | TaxBasisClass::Expense
        )
    }

    /// Basis to use when the income arises inside a tax-free wrapper.
    pub fn within_tax_free_wrapper(self) -> TaxBasisClass {
        match self {
            TaxBasisClass::Interest
            | TaxBasisClass::Dividend
            | TaxBasisClass::UnitTrustDividend
            | TaxBasisClass::CapitalGains => TaxBasisClass::TaxFree,
            other => other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TaxBasisClass::Salary => "Salary",
            TaxBasisClass::RoomRental => "Room rental",
            TaxBasisClass::Rental => "Rental",
            TaxBasisClass::Interest => "Interest",
            TaxBasisClass::Dividend => "Dividend",
            TaxBasisClass::UnitTrustDividend => "Unit trust dividend",
            TaxBasisClass::TaxFree => "Tax free",
            TaxBasisClass::TaxPaid => "Tax paid",
            TaxBasisClass::Market => "Market",
            TaxBasisClass::CapitalGains => "Capital gains",
            TaxBasisClass::ChargeableGains => "Chargeable gains",
            TaxBasisClass::Virtual => "Virtual",
            TaxBasisClass::BadDebtCapital => "Bad debt capital",
            TaxBasisClass::BadDebtInterest => "Bad debt interest",
            TaxBasisClass::Expense => "Expense",
        }
    }
}
