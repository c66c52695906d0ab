mod attribute;
mod bucket_values;
mod kinds;
mod value;

pub use attribute::{Attribute, Nature, ValueKind};
pub(crate) use attribute::attributes;
pub use bucket_values::BucketValues;
pub use kinds::{
    AccountAttr, CategoryAttr, PayeeAttr, PortfolioAttr, SecurityAttr, TagAttr, TaxBasisAttr,
};
pub use value::Value;
