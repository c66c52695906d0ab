use std::fmt;

use serde::{Deserialize, Serialize};

use super::Id;

/// A security held inside a particular portfolio.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoldingId {
    pub portfolio: Id,
    pub security: Id,
}

impl HoldingId {
    pub fn new(portfolio: impl Into<Id>, security: impl Into<Id>) -> Self {
        Self {
            portfolio: portfolio.into(),
            security: security.into(),
        }
    }
}

impl fmt::Display for HoldingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.portfolio, self.security)
    }
}

/// One side of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AssetRef {
    Deposit(Id),
    Cash(Id),
    Loan(Id),
    Portfolio(Id),
    Holding(HoldingId),
    Payee(Id),
}

/// The shape of an [`AssetRef`] without its identity, used to classify asset pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Deposit,
    Cash,
    Loan,
    Portfolio,
    Holding,
    Payee,
}

impl AssetRef {
    pub fn deposit(id: impl Into<Id>) -> Self {
        AssetRef::Deposit(id.into())
    }

    pub fn cash(id: impl Into<Id>) -> Self {
        AssetRef::Cash(id.into())
    }

    pub fn loan(id: impl Into<Id>) -> Self {
        AssetRef::Loan(id.into())
    }

    pub fn portfolio(id: impl Into<Id>) -> Self {
        AssetRef::Portfolio(id.into())
    }

    pub fn holding(portfolio: impl Into<Id>, security: impl Into<Id>) -> Self {
        AssetRef::Holding(HoldingId::new(portfolio, security))
    }

    pub fn payee(id: impl Into<Id>) -> Self {
        AssetRef::Payee(id.into())
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            AssetRef::Deposit(_) => AssetKind::Deposit,
            AssetRef::Cash(_) => AssetKind::Cash,
            AssetRef::Loan(_) => AssetKind::Loan,
            AssetRef::Portfolio(_) => AssetKind::Portfolio,
            AssetRef::Holding(_) => AssetKind::Holding,
            AssetRef::Payee(_) => AssetKind::Payee,
        }
    }

    /// Accounts hold money directly: deposits, cash, loans and portfolio cash.
    pub fn is_account(&self) -> bool {
        matches!(
            self,
            AssetRef::Deposit(_) | AssetRef::Cash(_) | AssetRef::Loan(_) | AssetRef::Portfolio(_)
        )
    }

    pub fn is_payee(&self) -> bool {
        matches!(self, AssetRef::Payee(_))
    }

    pub fn holding_id(&self) -> Option<&HoldingId> {
        match self {
            AssetRef::Holding(holding) => Some(holding),
            _ => None,
        }
    }

    pub fn payee_id(&self) -> Option<&Id> {
        match self {
            AssetRef::Payee(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Deposit(id) => write!(f, "deposit:{id}"),
            AssetRef::Cash(id) => write!(f, "cash:{id}"),
            AssetRef::Loan(id) => write!(f, "loan:{id}"),
            AssetRef::Portfolio(id) => write!(f, "portfolio:{id}"),
            AssetRef::Holding(holding) => write!(f, "holding:{holding}"),
            AssetRef::Payee(id) => write!(f, "payee:{id}"),
        }
    }
}
