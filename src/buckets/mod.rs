//! Bucket kinds and the lists an analysis keeps them in.

mod account;
mod bucket;
mod category;
mod chargeable_gain;
mod dilution;
mod list;
mod payee;
mod portfolio;
mod security;
mod tag;
mod tax_basis;
mod totals;

pub use account::{AccountBucket, AccountVariant, Movement};
pub use bucket::Bucket;
pub use category::{TransactionCategoryBucket, TransactionCategoryBucketList};
pub use chargeable_gain::ChargeableGainSlice;
pub(crate) use chargeable_gain::{slices_as_of, slices_for_range};
pub use dilution::{DilutionEvent, DilutionEventMap};
pub use list::BucketList;
pub use payee::{PayeeBucket, PayeeBucketList};
pub use portfolio::{PortfolioBucket, PortfolioBucketList};
pub use security::SecurityBucket;
pub use tag::{TransactionTagBucket, TransactionTagBucketList};
pub use tax_basis::{TaxAmounts, TaxBasisAccountBucket, TaxBasisBucket, TaxBasisBucketList};
pub use totals::TotalsBucket;

use crate::models::AssetRef;

/// Deposits, cash accounts and loans, keyed by their asset reference.
pub type AccountBucketList = BucketList<AssetRef, AccountBucket>;
