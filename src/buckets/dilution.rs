use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{DateRange, Id};

/// One recorded change to the value of a security's units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DilutionEvent {
    pub date: NaiveDate,
    /// Fraction of a unit's value that remains after the event.
    pub factor: Decimal,
}

/// Chronological dilution events per security.
///
/// A price quoted before an event is multiplied by the event's factor to be
/// comparable with prices quoted after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DilutionEventMap {
    events: BTreeMap<Id, Vec<DilutionEvent>>,
}

impl DilutionEventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events arrive in pass order, so each list stays sorted by date.
    pub fn record(&mut self, security: &Id, date: NaiveDate, factor: Decimal) {
        let events = self.events.entry(security.clone()).or_default();
        let at = events.partition_point(|e| e.date <= date);
        events.insert(at, DilutionEvent { date, factor });
    }

    pub fn events(&self, security: &Id) -> &[DilutionEvent] {
        self.events.get(security).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Product of the factors of events dated after `from` and on or before `to`.
    pub fn factor_between(&self, security: &Id, from: NaiveDate, to: NaiveDate) -> Decimal {
        self.events(security)
            .iter()
            .filter(|e| e.date > from && e.date <= to)
            .fold(Decimal::ONE, |acc, e| acc * e.factor)
    }

    /// Restate a price quoted on `quoted` in terms of units as they stand on `as_of`.
    pub fn diluted_price(
        &self,
        security: &Id,
        price: Decimal,
        quoted: NaiveDate,
        as_of: NaiveDate,
    ) -> Decimal {
        price * self.factor_between(security, quoted, as_of)
    }

    pub fn as_of(&self, date: NaiveDate) -> Self {
        self.filtered(|e| e.date <= date)
    }

    pub fn for_range(&self, range: DateRange) -> Self {
        self.filtered(|e| range.contains(e.date))
    }

    fn filtered(&self, keep: impl Fn(&DilutionEvent) -> bool) -> Self {
        let events = self
            .events
            .iter()
            .map(|(id, events)| {
                let kept: Vec<DilutionEvent> = events.iter().copied().filter(|e| keep(e)).collect();
                (id.clone(), kept)
            })
            .filter(|(_, kept)| !kept.is_empty())
            .collect();
        Self { events }
    }
}
