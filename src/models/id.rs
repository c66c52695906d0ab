use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for reference entities and transactions.
///
/// Ordered so that bucket lists keyed by id iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(Id::new(), Id::new());
    }

    #[test]
    fn from_string_keeps_value() {
        let id = Id::from_string("deposit-123");
        assert_eq!(id.as_str(), "deposit-123");
        assert_eq!(id.to_string(), "deposit-123");
    }

    #[test]
    fn ids_order_lexically() {
        let mut ids = vec![Id::from("b"), Id::from("a"), Id::from("c")];
        ids.sort();
        assert_eq!(ids, vec![Id::from("a"), Id::from("b"), Id::from("c")]);
    }
}
