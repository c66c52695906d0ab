use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::buckets::TaxBasisBucketList;
use crate::models::DateRange;

/// Outcome of running a tax year's rules over an analysis' tax bases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAnalysis {
    pub year: DateRange,
    pub taxable_income: Decimal,
    pub tax_due: Decimal,
    pub tax_paid: Decimal,
}

impl TaxAnalysis {
    /// Positive when more tax is owed than has been paid.
    pub fn balance(&self) -> Decimal {
        self.tax_due - self.tax_paid
    }
}

/// One jurisdiction-specific tax year.
pub trait TaxYear: fmt::Debug + Send + Sync {
    fn range(&self) -> DateRange;

    fn analyse_tax_year(&self, bases: &TaxBasisBucketList) -> TaxAnalysis;
}

/// Finds the tax year covering an analysis range.
pub trait TaxYearCalculator {
    fn find_tax_year_for_range(&self, range: DateRange) -> Option<Arc<dyn TaxYear>>;
}
