use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::models::{Currency, DateRange, HoldingId};

/// A chargeable gain spread over the complete years the policy was held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeableGainSlice {
    pub date: NaiveDate,
    pub holding: HoldingId,
    pub gain: Decimal,
    pub years: u32,
    pub slice: Decimal,
}

impl ChargeableGainSlice {
    /// Slice `gain` over the complete years from `start` to `date`, never
    /// fewer than `min_years`.
    pub fn new(
        holding: HoldingId,
        date: NaiveDate,
        start: Option<NaiveDate>,
        gain: Decimal,
        min_years: u32,
        reporting: &Currency,
    ) -> Self {
        let years = start
            .map(|start| complete_years(start, date))
            .unwrap_or(0)
            .max(min_years)
            .max(1);
        Self {
            date,
            holding,
            gain,
            years,
            slice: reporting.round(gain / Decimal::from(years)),
        }
    }
}

fn complete_years(start: NaiveDate, end: NaiveDate) -> u32 {
    if end <= start {
        return 0;
    }
    let mut years = end.year() - start.year();
    if (end.month(), end.day()) < (start.month(), start.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

pub(crate) fn slices_as_of(slices: &[ChargeableGainSlice], date: NaiveDate) -> Vec<ChargeableGainSlice> {
    slices.iter().filter(|s| s.date <= date).cloned().collect()
}

pub(crate) fn slices_for_range(
    slices: &[ChargeableGainSlice],
    range: DateRange,
) -> Vec<ChargeableGainSlice> {
    slices
        .iter()
        .filter(|s| range.contains(s.date))
        .cloned()
        .collect()
}
