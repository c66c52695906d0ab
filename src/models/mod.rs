mod account;
mod asset;
mod category;
mod currency;
mod dataset;
mod date_range;
mod id;
mod tax_basis;
mod transaction;

pub use account::{
    AutoExpense, Cash, Deposit, DepositClass, Loan, LoanClass, Payee, PayeeClass, Portfolio,
    Security, SecurityClass,
};
pub use asset::{AssetKind, AssetRef, HoldingId};
pub use category::{CategoryClass, TransactionCategory, TransactionTag};
pub use currency::Currency;
pub use dataset::Dataset;
pub use date_range::DateRange;
pub use id::Id;
pub use tax_basis::TaxBasisClass;
pub use transaction::{Direction, ReturnedCash, Transaction};
