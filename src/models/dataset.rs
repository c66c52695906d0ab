use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{
    AssetRef, CategoryClass, Cash, Currency, DateRange, Deposit, Id, Loan, Payee, PayeeClass,
    Portfolio, Security, Transaction, TransactionCategory, TransactionTag,
};
use crate::error::{AnalysisError, Result};

/// Fully loaded reference data plus the transaction ledger for one analysis.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    default_currency: Option<Currency>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    deposits: BTreeMap<Id, Deposit>,
    cash: BTreeMap<Id, Cash>,
    loans: BTreeMap<Id, Loan>,
    portfolios: BTreeMap<Id, Portfolio>,
    securities: BTreeMap<Id, Security>,
    payees: BTreeMap<Id, Payee>,
    categories: BTreeMap<Id, TransactionCategory>,
    tags: BTreeMap<Id, TransactionTag>,
    transactions: Vec<Transaction>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_currency(mut self, currency: impl Into<Currency>) -> Self {
        self.default_currency = Some(currency.into());
        self
    }

    /// Date opening balances are held from, when it precedes the first transaction.
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Date the analysis runs to, when later than the last transaction.
    /// Holdings are valued on this date.
    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn with_deposit(mut self, deposit: Deposit) -> Self {
        self.deposits.insert(deposit.id.clone(), deposit);
        self
    }

    pub fn with_cash(mut self, cash: Cash) -> Self {
        self.cash.insert(cash.id.clone(), cash);
        self
    }

    pub fn with_loan(mut self, loan: Loan) -> Self {
        self.loans.insert(loan.id.clone(), loan);
        self
    }

    pub fn with_portfolio(mut self, portfolio: Portfolio) -> Self {
        self.portfolios.insert(portfolio.id.clone(), portfolio);
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.securities.insert(security.id.clone(), security);
        self
    }

    pub fn with_payee(mut self, payee: Payee) -> Self {
        self.payees.insert(payee.id.clone(), payee);
        self
    }

    pub fn with_category(mut self, category: TransactionCategory) -> Self {
        self.categories.insert(category.id.clone(), category);
        self
    }

    pub fn with_tag(mut self, tag: TransactionTag) -> Self {
        self.tags.insert(tag.id.clone(), tag);
        self
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn with_transactions(mut self, transactions: impl IntoIterator<Item = Transaction>) -> Self {
        self.transactions.extend(transactions);
        self
    }

    pub fn default_currency(&self) -> Option<&Currency> {
        self.default_currency.as_ref()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Copy of this dataset keeping only transactions accepted by `keep`.
    pub fn filtered(&self, keep: impl Fn(&Transaction) -> bool) -> Self {
        let mut copy = self.clone();
        copy.transactions.retain(|tx| keep(tx));
        copy
    }

    /// Live transactions in pass order: by date, ties kept in ledger order.
    pub fn sorted_transactions(&self) -> Vec<&Transaction> {
        let mut live: Vec<&Transaction> = self.transactions.iter().filter(|t| !t.deleted).collect();
        live.sort_by_key(|t| t.date);
        live
    }

    /// Earliest to latest live transaction date.
    pub fn date_range(&self) -> Option<DateRange> {
        let mut dates = self
            .transactions
            .iter()
            .filter(|t| !t.deleted)
            .map(|t| t.date);
        let first = dates.next()?;
        let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateRange::new(start, end))
    }

    pub fn deposit(&self, id: &Id) -> Result<&Deposit> {
        lookup(&self.deposits, id, "deposit")
    }

    pub fn cash(&self, id: &Id) -> Result<&Cash> {
        lookup(&self.cash, id, "cash")
    }

    pub fn loan(&self, id: &Id) -> Result<&Loan> {
        lookup(&self.loans, id, "loan")
    }

    pub fn portfolio(&self, id: &Id) -> Result<&Portfolio> {
        lookup(&self.portfolios, id, "portfolio")
    }

    pub fn security(&self, id: &Id) -> Result<&Security> {
        lookup(&self.securities, id, "security")
    }

    pub fn payee(&self, id: &Id) -> Result<&Payee> {
        lookup(&self.payees, id, "payee")
    }

    pub fn category(&self, id: &Id) -> Result<&TransactionCategory> {
        lookup(&self.categories, id, "category")
    }

    pub fn tag(&self, id: &Id) -> Result<&TransactionTag> {
        lookup(&self.tags, id, "tag")
    }

    pub fn deposits(&self) -> impl Iterator<Item = &Deposit> {
        self.deposits.values()
    }

    pub fn cash_accounts(&self) -> impl Iterator<Item = &Cash> {
        self.cash.values()
    }

    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    pub fn portfolios(&self) -> impl Iterator<Item = &Portfolio> {
        self.portfolios.values()
    }

    pub fn securities(&self) -> impl Iterator<Item = &Security> {
        self.securities.values()
    }

    pub fn categories(&self) -> impl Iterator<Item = &TransactionCategory> {
        self.categories.values()
    }

    /// The single category of a singular class.
    pub fn singular_category(&self, class: CategoryClass) -> Result<&TransactionCategory> {
        self.find_singular_category(class)
            .ok_or(AnalysisError::MissingSingular(class))
    }

    pub fn find_singular_category(&self, class: CategoryClass) -> Option<&TransactionCategory> {
        self.categories.values().find(|c| c.class == class)
    }

    /// The tax authority payee.
    pub fn tax_man(&self) -> Result<&Payee> {
        self.payees
            .values()
            .find(|p| p.class == PayeeClass::TaxMan)
            .ok_or_else(|| AnalysisError::UnknownReference {
                kind: "tax authority payee",
                id: "<tax man>".to_string(),
            })
    }

    /// Colon-separated path from the root category, e.g. `Income:Salary`.
    pub fn category_full_name(&self, id: &Id) -> Result<String> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cat_id) = current {
            let category = self.category(cat_id)?;
            names.push(category.name.as_str());
            current = category.parent.as_ref();
            if names.len() > self.categories.len() {
                // Cycle in the parent chain.
                return Err(AnalysisError::UnknownReference {
                    kind: "category parent",
                    id: id.to_string(),
                });
            }
        }
        names.reverse();
        Ok(names.join(":"))
    }

    /// Number of ancestors above the category.
    pub fn category_depth(&self, id: &Id) -> Result<usize> {
        Ok(self.category_full_name(id)?.matches(':').count())
    }

    /// Currency that money held in `asset` is denominated in.
    ///
    /// Payees have no currency of their own and take the reporting currency.
    pub fn asset_currency(&self, asset: &AssetRef, reporting: &Currency) -> Result<Currency> {
        Ok(match asset {
            AssetRef::Deposit(id) => self.deposit(id)?.currency.clone(),
            AssetRef::Cash(id) => self.cash(id)?.currency.clone(),
            AssetRef::Loan(id) => self.loan(id)?.currency.clone(),
            AssetRef::Portfolio(id) => self.portfolio(id)?.currency.clone(),
            AssetRef::Holding(holding) => {
                self.portfolio(&holding.portfolio)?;
                self.security(&holding.security)?.currency.clone()
            }
            AssetRef::Payee(id) => {
                self.payee(id)?;
                reporting.clone()
            }
        })
    }

    /// Whether income booked against `asset` is sheltered from tax.
    pub fn is_tax_free(&self, asset: &AssetRef) -> Result<bool> {
        Ok(match asset {
            AssetRef::Deposit(id) => {
                self.deposit(id)?.class == super::DepositClass::TaxFreeSavings
            }
            AssetRef::Portfolio(id) => self.portfolio(id)?.tax_free,
            AssetRef::Holding(holding) => self.portfolio(&holding.portfolio)?.tax_free,
            _ => false,
        })
    }

    /// Date opening balances are held from: the configured start date, else
    /// the first live transaction date.
    pub fn start_date(&self) -> Option<NaiveDate> {
        let first = self.date_range().map(|r| r.start);
        match (self.start_date, first) {
            (Some(start), Some(first)) => Some(start.min(first)),
            (start, first) => start.or(first),
        }
    }

    /// Span an analysis of this dataset covers: start date to the later of
    /// the last transaction and the configured end date.
    pub fn analysis_range(&self) -> Option<DateRange> {
        let start = self.start_date()?;
        let last = self.date_range().map(|r| r.end).unwrap_or(start);
        let end = self.end_date.map_or(last, |end| end.max(last));
        Some(DateRange::new(start, end.max(start)))
    }
}

fn lookup<'a, T>(map: &'a BTreeMap<Id, T>, id: &Id, kind: &'static str) -> Result<&'a T> {
    map.get(id).ok_or_else(|| AnalysisError::UnknownReference {
        kind,
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn categories() -> Dataset {
        Dataset::new()
            .with_category(TransactionCategory::new("income", CategoryClass::Parent).with_name("Income"))
            .with_category(
                TransactionCategory::new("salary", CategoryClass::TaxedIncome)
                    .with_name("Salary")
                    .with_parent("income"),
            )
            .with_category(
                TransactionCategory::new("bonus", CategoryClass::TaxedIncome)
                    .with_name("Bonus")
                    .with_parent("salary"),
            )
    }

    #[test]
    fn full_names_and_depths_follow_parent_chain() {
        let data = categories();
        assert_eq!(
            data.category_full_name(&Id::from("bonus")).unwrap(),
            "Income:Salary:Bonus"
        );
        assert_eq!(data.category_depth(&Id::from("income")).unwrap(), 0);
        assert_eq!(data.category_depth(&Id::from("bonus")).unwrap(), 2);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let data = Dataset::new();
        let err = data.deposit(&Id::from("nope")).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UnknownReference {
                kind: "deposit",
                id: "nope".to_string()
            }
        );
    }

    #[test]
    fn sorted_transactions_skip_deleted_and_keep_ledger_order_on_ties() {
        let a = AssetRef::deposit("a");
        let p = AssetRef::payee("p");
        let data = Dataset::new().with_transactions([
            Transaction::new(date(5), a.clone(), p.clone(), "c", Decimal::ONE).with_id("late"),
            Transaction::new(date(2), a.clone(), p.clone(), "c", Decimal::ONE).with_id("first"),
            Transaction::new(date(2), a.clone(), p.clone(), "c", Decimal::ONE).with_id("second"),
            Transaction::new(date(1), a, p, "c", Decimal::ONE)
                .with_id("gone")
                .deleted(),
        ]);
        let ids: Vec<&str> = data
            .sorted_transactions()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "late"]);
        assert_eq!(data.date_range(), Some(DateRange::new(date(2), date(5))));
    }

    #[test]
    fn analysis_range_starts_at_configured_start_date() {
        assert_eq!(Dataset::new().analysis_range(), None);
        let empty = Dataset::new().with_start_date(date(1));
        assert_eq!(empty.analysis_range(), Some(DateRange::new(date(1), date(1))));

        let a = AssetRef::deposit("a");
        let p = AssetRef::payee("p");
        let data = Dataset::new()
            .with_start_date(date(3))
            .with_transaction(Transaction::new(date(9), a, p, "c", Decimal::ONE));
        assert_eq!(data.analysis_range(), Some(DateRange::new(date(3), date(9))));
        assert_eq!(data.start_date(), Some(date(3)));
    }

    #[test]
    fn end_date_only_extends_the_range() {
        let a = AssetRef::deposit("a");
        let p = AssetRef::payee("p");
        let data = Dataset::new().with_transaction(Transaction::new(date(5), a, p, "c", Decimal::ONE));
        assert_eq!(
            data.clone().with_end_date(date(20)).analysis_range(),
            Some(DateRange::new(date(5), date(20)))
        );
        assert_eq!(
            data.with_end_date(date(2)).analysis_range(),
            Some(DateRange::new(date(5), date(5)))
        );
    }
}
