use serde::{Deserialize, Serialize};

use super::{Id, TaxBasisClass};

/// Behavioural class of a transaction category.
///
/// The class decides which analysis branch a transaction takes and which tax
/// basis its amounts land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryClass {
    /// Grouping header with no behaviour of its own.
    Parent,

    // Income
    TaxedIncome,
    RentalIncome,
    RoomRentalIncome,
    Interest,
    TaxFreeInterest,
    PeerToPeerInterest,
    Dividend,
    TaxFreeDividend,
    Inheritance,
    GiftedIncome,
    LoyaltyBonus,
    CashBack,
    LoanInterestEarned,
    OtherIncome,
    OpeningBalance,
    CapitalGain,
    ChargeableGain,
    MarketGrowth,
    CurrencyFluctuation,

    // Expense
    Expense,
    LocalTaxes,
    TaxSettlement,
    TaxCredit,
    NatInsurance,
    DeemedBenefit,
    Withheld,
    LoanInterestCharged,
    BadDebtCapital,
    BadDebtInterest,
    WriteOff,

    // Transfers and corporate actions
    Transfer,
    StockSplit,
    UnitsAdjust,
    StockDeMerger,
    StockTakeOver,
    SecurityReplace,
    StockRightsIssue,
    ReturnOfCapital,
    PortfolioXfer,
}

impl CategoryClass {
    pub fn is_income(self) -> bool {
        use CategoryClass::*;
        matches!(
            self,
            TaxedIncome
                | RentalIncome
                | RoomRentalIncome
                | Interest
                | TaxFreeInterest
                | PeerToPeerInterest
                | Dividend
                | TaxFreeDividend
                | Inheritance
                | GiftedIncome
                | LoyaltyBonus
                | CashBack
                | LoanInterestEarned
                | OtherIncome
                | OpeningBalance
                | CapitalGain
                | ChargeableGain
                | MarketGrowth
                | CurrencyFluctuation
        )
    }

    pub fn is_expense(self) -> bool {
        use CategoryClass::*;
        matches!(
            self,
            Expense
                | LocalTaxes
                | TaxSettlement
                | TaxCredit
                | NatInsurance
                | DeemedBenefit
                | Withheld
                | LoanInterestCharged
                | BadDebtCapital
                | BadDebtInterest
                | WriteOff
        )
    }

    /// Transfers and corporate actions move value without income or expense.
    pub fn is_transfer(self) -> bool {
        !self.is_income() && !self.is_expense() && self != CategoryClass::Parent
    }

    /// Classes that only make sense against security holdings.
    pub fn is_corporate_action(self) -> bool {
        use CategoryClass::*;
        matches!(
            self,
            StockSplit
                | UnitsAdjust
                | StockDeMerger
                | StockTakeOver
                | SecurityReplace
                | StockRightsIssue
                | ReturnOfCapital
                | PortfolioXfer
        )
    }

    pub fn is_dividend(self) -> bool {
        matches!(self, CategoryClass::Dividend | CategoryClass::TaxFreeDividend)
    }

    pub fn is_bad_debt(self) -> bool {
        matches!(
            self,
            CategoryClass::BadDebtCapital | CategoryClass::BadDebtInterest
        )
    }

    /// Exactly one category of a singular class may exist; the analysis looks
    /// it up by class rather than by id.
    pub fn is_singular(self) -> bool {
        use CategoryClass::*;
        matches!(
            self,
            OpeningBalance
                | CapitalGain
                | ChargeableGain
                | MarketGrowth
                | CurrencyFluctuation
                | TaxCredit
                | NatInsurance
                | DeemedBenefit
                | Withheld
        )
    }

    /// Default tax basis for amounts booked against this class, before any
    /// tax-free wrapper is taken into account.
    pub fn tax_basis(self) -> Option<TaxBasisClass> {
        use CategoryClass::*;
        let basis = match self {
            TaxedIncome => TaxBasisClass::Salary,
            RentalIncome => TaxBasisClass::Rental,
            RoomRentalIncome => TaxBasisClass::RoomRental,
            Interest | PeerToPeerInterest | LoanInterestEarned => TaxBasisClass::Interest,
            Dividend => TaxBasisClass::Dividend,
            TaxFreeInterest | TaxFreeDividend | Inheritance | GiftedIncome | LoyaltyBonus
            | CashBack | OtherIncome => TaxBasisClass::TaxFree,
            CapitalGain => TaxBasisClass::CapitalGains,
            ChargeableGain => TaxBasisClass::ChargeableGains,
            MarketGrowth | CurrencyFluctuation => TaxBasisClass::Market,
            OpeningBalance => TaxBasisClass::Virtual,
            Expense | LocalTaxes | LoanInterestCharged | WriteOff | Withheld => {
                TaxBasisClass::Expense
            }
            TaxSettlement | TaxCredit | NatInsurance => TaxBasisClass::TaxPaid,
            DeemedBenefit => TaxBasisClass::Virtual,
            BadDebtCapital => TaxBasisClass::BadDebtCapital,
            BadDebtInterest => TaxBasisClass::BadDebtInterest,
            Parent | Transfer | StockSplit | UnitsAdjust | StockDeMerger | StockTakeOver
            | SecurityReplace | StockRightsIssue | ReturnOfCapital | PortfolioXfer => {
                return None
            }
        };
        Some(basis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCategory {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Id>,
    pub class: CategoryClass,
}

impl TransactionCategory {
    pub fn new(id: impl Into<Id>, class: CategoryClass) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            parent: None,
            class,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<Id>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionTag {
    pub id: Id,
    pub name: String,
}

impl TransactionTag {
    pub fn new(id: impl Into<Id>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
        }
    }
}
