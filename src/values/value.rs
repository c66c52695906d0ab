use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::ValueKind;

/// One stored slot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Money(Decimal),
    Units(Decimal),
    Price(Decimal),
    Ratio(Decimal),
    Date(NaiveDate),
}

impl Value {
    /// Wrap a number as a value of `kind`; `None` for date slots.
    pub fn from_decimal(kind: ValueKind, amount: Decimal) -> Option<Self> {
        match kind {
            ValueKind::Money => Some(Value::Money(amount)),
            ValueKind::Units => Some(Value::Units(amount)),
            ValueKind::Price => Some(Value::Price(amount)),
            ValueKind::Ratio => Some(Value::Ratio(amount)),
            ValueKind::Date => None,
        }
    }

    pub fn zero(kind: ValueKind) -> Option<Self> {
        Self::from_decimal(kind, Decimal::ZERO)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Money(_) => ValueKind::Money,
            Value::Units(_) => ValueKind::Units,
            Value::Price(_) => ValueKind::Price,
            Value::Ratio(_) => ValueKind::Ratio,
            Value::Date(_) => ValueKind::Date,
        }
    }

    pub fn decimal(&self) -> Option<Decimal> {
        match *self {
            Value::Money(d) | Value::Units(d) | Value::Price(d) | Value::Ratio(d) => Some(d),
            Value::Date(_) => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match *self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Money(d) | Value::Units(d) | Value::Price(d) | Value::Ratio(d) => d.fmt(f),
            Value::Date(d) => d.fmt(f),
        }
    }
}
