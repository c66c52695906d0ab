use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency code, normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

/// Currencies without minor units.
const ZERO_DECIMAL_CODES: &[&str] = &["JPY", "KRW", "ISK", "CLP", "VND"];

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of minor-unit decimal places money in this currency carries.
    pub fn decimals(&self) -> u32 {
        if ZERO_DECIMAL_CODES.contains(&self.0.as_str()) {
            0
        } else {
            2
        }
    }

    /// Round a money amount to this currency's minor units.
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimals(), RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Currency {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Currency {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}
