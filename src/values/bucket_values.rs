use std::fmt;
use std::marker::PhantomData;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{Attribute, Nature, Value, ValueKind};

/// Attribute-indexed values of one bucket at one instant.
///
/// Each slot is explicitly present or absent. A bucket allocates the slots it
/// guarantees at creation; everything else stays absent until set.
#[derive(Clone, PartialEq, Eq)]
pub struct BucketValues<A: Attribute> {
    slots: Vec<Option<Value>>,
    _attr: PhantomData<A>,
}

impl<A: Attribute> Default for BucketValues<A> {
    fn default() -> Self {
        Self {
            slots: vec![None; A::ALL.len()],
            _attr: PhantomData,
        }
    }
}

impl<A: Attribute> fmt::Debug for BucketValues<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(attr, value)| (attr.name(), value)))
            .finish()
    }
}

impl<A: Attribute> BucketValues<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values with each of `attrs` present and zero. Date slots stay absent.
    pub fn allocated(attrs: &[A]) -> Self {
        let mut values = Self::new();
        for &attr in attrs {
            values.slots[attr.index()] = Value::zero(attr.kind());
        }
        values
    }

    /// Overwrite a slot.
    pub fn set_value(&mut self, attr: A, value: Value) {
        debug_assert_eq!(attr.kind(), value.kind(), "{} kind mismatch", attr.name());
        self.slots[attr.index()] = Some(value);
    }

    pub fn set_decimal(&mut self, attr: A, amount: Decimal) {
        debug_assert_ne!(attr.kind(), ValueKind::Date, "{} is a date", attr.name());
        self.slots[attr.index()] = Value::from_decimal(attr.kind(), amount);
    }

    pub fn set_date(&mut self, attr: A, date: NaiveDate) {
        self.set_value(attr, Value::Date(date));
    }

    pub fn clear(&mut self, attr: A) {
        self.slots[attr.index()] = None;
    }

    /// Add `delta` to a numeric slot, treating an absent slot as zero.
    pub fn adjust(&mut self, attr: A, delta: Decimal) {
        let current = self.decimal(attr);
        self.set_decimal(attr, current + delta);
    }

    pub fn is_present(&self, attr: A) -> bool {
        self.slots[attr.index()].is_some()
    }

    pub fn get_value(&self, attr: A) -> Option<&Value> {
        self.slots[attr.index()].as_ref()
    }

    pub fn get_money_value(&self, attr: A) -> Option<Decimal> {
        match self.get_value(attr)? {
            Value::Money(d) => Some(*d),
            _ => None,
        }
    }

    pub fn get_units_value(&self, attr: A) -> Option<Decimal> {
        match self.get_value(attr)? {
            Value::Units(d) => Some(*d),
            _ => None,
        }
    }

    pub fn get_price_value(&self, attr: A) -> Option<Decimal> {
        match self.get_value(attr)? {
            Value::Price(d) => Some(*d),
            _ => None,
        }
    }

    pub fn get_ratio_value(&self, attr: A) -> Option<Decimal> {
        match self.get_value(attr)? {
            Value::Ratio(d) => Some(*d),
            _ => None,
        }
    }

    pub fn get_date_value(&self, attr: A) -> Option<NaiveDate> {
        self.get_value(attr)?.date()
    }

    /// Numeric value of a slot, zero when absent.
    pub fn decimal(&self, attr: A) -> Decimal {
        self.get_value(attr)
            .and_then(Value::decimal)
            .unwrap_or(Decimal::ZERO)
    }

    /// Present slots in attribute order.
    pub fn iter(&self) -> impl Iterator<Item = (A, &Value)> + '_ {
        A::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(attr, slot)| slot.as_ref().map(|v| (*attr, v)))
    }

    /// Independent copy; with `counters_only`, point slots are left absent.
    pub fn snapshot(&self, counters_only: bool) -> Self {
        if !counters_only {
            return self.clone();
        }
        let mut copy = Self::new();
        for &attr in A::ALL {
            if attr.is_counter() {
                copy.slots[attr.index()] = self.slots[attr.index()];
            }
        }
        copy
    }

    /// Turn since-inception flow totals into since-`base` totals.
    pub fn adjust_to_base_values(&mut self, base: &Self) {
        for &attr in A::ALL {
            if attr.nature() != Nature::Flow {
                continue;
            }
            if let Some(base_amount) = base.get_value(attr).and_then(Value::decimal) {
                self.adjust(attr, -base_amount);
            }
        }
    }

    /// Zero the flow slots of a base after [`Self::adjust_to_base_values`].
    pub fn reset_base_values(&mut self) {
        for &attr in A::ALL {
            if attr.nature() == Nature::Flow && self.is_present(attr) {
                self.set_decimal(attr, Decimal::ZERO);
            }
        }
    }

    /// Add every numeric slot present in `other` into this one.
    pub fn accumulate(&mut self, other: &Self) {
        for (attr, value) in other.iter() {
            if let Some(amount) = value.decimal() {
                self.adjust(attr, amount);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        A::ACTIVITY.iter().any(|&attr| !self.decimal(attr).is_zero())
    }

    /// True when every numeric slot is absent or zero.
    pub fn is_zero(&self) -> bool {
        self.iter()
            .all(|(_, v)| v.decimal().map_or(true, |d| d.is_zero()))
    }
}
