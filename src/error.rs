use chrono::NaiveDate;

use crate::models::{AssetKind, CategoryClass, Currency, Id};

/// Errors that abort an analysis pass or the derivation of a view.
///
/// Every variant is either a data-consistency defect in the input ledger or a
/// lookup miss against the reference market data. The computation is pure, so
/// none of these are worth retrying.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("{kind} {id} is closed but still holds a balance after the analysis pass")]
    ClosedButActive { kind: &'static str, id: String },

    #[error(
        "Transaction {transaction}: invalid asset pair {debit:?} -> {credit:?} for category class {class:?}"
    )]
    InvalidAssetPair {
        transaction: Id,
        debit: AssetKind,
        credit: AssetKind,
        class: CategoryClass,
    },

    #[error("Transaction {transaction}: disposes of {requested} units but only {held} are held")]
    UnitsExceedHolding {
        transaction: Id,
        requested: String,
        held: String,
    },

    #[error("Transaction {transaction}: {class:?} requires a dilution factor")]
    MissingDilution {
        transaction: Id,
        class: CategoryClass,
    },

    #[error("Transaction {transaction}: {class:?} requires a units delta")]
    MissingUnits {
        transaction: Id,
        class: CategoryClass,
    },

    #[error("Unknown {kind} reference: {id}")]
    UnknownReference { kind: &'static str, id: String },

    #[error("Dataset defines no category of singular class {0:?}")]
    MissingSingular(CategoryClass),

    #[error("Transaction {transaction} dated {date} is earlier than the previous registration on {previous}")]
    OutOfOrder {
        transaction: Id,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("Dataset has no live transactions and no start date to anchor an analysis")]
    EmptyDataset,

    #[error("No price for security {security} on or before {date}")]
    MissingPrice { security: Id, date: NaiveDate },

    #[error("No exchange rate for {currency} on or before {date}")]
    MissingRate { currency: Currency, date: NaiveDate },

    #[error("Exchange rate for {currency} is zero; cannot convert {amount} back into it")]
    ZeroRate { currency: Currency, amount: String },
}

impl AnalysisError {
    /// Reference market data was missing for a date the analysis needed.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingPrice { .. } | AnalysisError::MissingRate { .. }
        )
    }

    /// The ledger or reference dataset is internally inconsistent.
    pub fn is_data_consistency(&self) -> bool {
        !self.is_lookup_miss()
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
