mod support;

use std::sync::Arc;

use anyhow::Result;
use bucketbook::buckets::Bucket;
use bucketbook::market_data::MemoryMarketData;
use bucketbook::models::{
    AssetRef, Cash, CategoryClass, Dataset, Deposit, HoldingId, Id, Payee, PayeeClass,
    TaxBasisClass, Transaction, TransactionCategory, TransactionTag,
};
use bucketbook::values::{AccountAttr, CategoryAttr, SecurityAttr, TagAttr, TaxBasisAttr};
use bucketbook::{AnalysisConfig, AnalysisError, AnalysisManager};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use support::{buy, date, expense, household, income, init_tracing};

fn bank() -> AssetRef {
    AssetRef::deposit("bank")
}

#[test]
fn simple_ledger_salary_and_spending() -> Result<()> {
    init_tracing();
    let dataset = household()
        .with_transaction(income(date(1, 5), bank(), "employer", "salary", dec!(250.00)))
        .with_transaction(expense(date(1, 10), bank(), "shop", "groceries", dec!(100.00)));
    let manager = AnalysisManager::new(
        dataset,
        Arc::new(MemoryMarketData::new()),
        AnalysisConfig::default(),
    )?;

    let full = manager.full_analysis()?;
    assert_eq!(full.account(&bank()).unwrap().valuation(), dec!(1150.00));
    assert_eq!(full.payee(&Id::from("employer")).unwrap().income(), dec!(250.00));
    assert_eq!(full.payee(&Id::from("shop")).unwrap().expense(), dec!(100.00));
    let salary = full.tax_basis(TaxBasisClass::Salary).unwrap();
    assert_eq!(salary.value(TaxBasisAttr::Gross), dec!(250.00));

    let dated = manager.analysis_as_of(date(1, 7))?;
    assert_eq!(dated.account(&bank()).unwrap().valuation(), dec!(1250.00));
    assert!(dated.payee(&Id::from("shop")).is_none());
    Ok(())
}

#[test]
fn foreign_security_purchase_records_both_currencies() -> Result<()> {
    init_tracing();
    let market = MemoryMarketData::new()
        .with_rate("USD", date(3, 1), dec!(0.80))
        .with_price("spy", date(3, 1), dec!(10));
    let dataset = household().with_transaction(buy(date(3, 1), "gia", "spy", dec!(100), dec!(1000)));
    let manager = AnalysisManager::new(dataset, Arc::new(market), AnalysisConfig::default())?;

    let holding = HoldingId::new("gia", "spy");
    let raw = manager.raw_analysis().holding(&holding).unwrap();
    assert_eq!(raw.invested(), dec!(800.00));
    assert_eq!(raw.foreign_invested(), dec!(1000.00));
    assert_eq!(raw.units(), dec!(100));

    let full = manager.full_analysis()?;
    let view = full.holding(&holding).unwrap();
    assert_eq!(view.value(SecurityAttr::Valuation), dec!(800.00));
    assert_eq!(view.value(SecurityAttr::ForeignValuation), dec!(1000.00));
    assert_eq!(view.value(SecurityAttr::Profit), Decimal::ZERO);
    assert_eq!(view.value(SecurityAttr::CurrencyFluct), Decimal::ZERO);
    assert_eq!(
        full.account(&AssetRef::portfolio("gia")).unwrap().valuation(),
        dec!(-800.00)
    );
    Ok(())
}

#[test]
fn taxed_income_books_gross_and_deductions() -> Result<()> {
    init_tracing();
    let dataset = household().with_transaction(
        income(date(4, 25), bank(), "employer", "salary", dec!(1000.00))
            .with_tax_credit(dec!(250.00))
            .with_nat_insurance(dec!(80.00)),
    );
    let manager = AnalysisManager::new(
        dataset,
        Arc::new(MemoryMarketData::new()),
        AnalysisConfig::default(),
    )?;
    let full = manager.full_analysis()?;

    assert_eq!(full.account(&bank()).unwrap().valuation(), dec!(2000.00));
    assert_eq!(full.payee(&Id::from("employer")).unwrap().income(), dec!(1330.00));
    assert_eq!(full.payee(&Id::from("hmrc")).unwrap().expense(), dec!(330.00));
    assert_eq!(
        full.category(&Id::from("salary")).unwrap().total(CategoryAttr::Income),
        dec!(1330.00)
    );
    assert_eq!(
        full.category(&Id::from("tax-credit")).unwrap().total(CategoryAttr::Expense),
        dec!(250.00)
    );
    assert_eq!(
        full.category(&Id::from("national-insurance"))
            .unwrap()
            .total(CategoryAttr::Expense),
        dec!(80.00)
    );

    let salary = full.tax_basis(TaxBasisClass::Salary).unwrap();
    assert_eq!(salary.value(TaxBasisAttr::Gross), dec!(1330.00));
    assert_eq!(salary.value(TaxBasisAttr::Nett), dec!(1000.00));
    assert_eq!(salary.value(TaxBasisAttr::TaxCredit), dec!(250.00));
    assert_eq!(
        salary.account(&bank()).unwrap().value(TaxBasisAttr::Gross),
        dec!(1330.00)
    );
    Ok(())
}

#[test]
fn tax_authority_is_needed_only_when_tax_was_paid() -> Result<()> {
    let without_tax_man = Dataset::new()
        .with_default_currency("GBP")
        .with_deposit(Deposit::new("bank", "GBP"))
        .with_payee(Payee::new("employer", PayeeClass::Employer))
        .with_category(TransactionCategory::new("salary", CategoryClass::TaxedIncome));

    let untaxed = without_tax_man
        .clone()
        .with_transaction(income(date(4, 25), bank(), "employer", "salary", dec!(10)));
    AnalysisManager::new(untaxed, Arc::new(MemoryMarketData::new()), AnalysisConfig::default())?;

    let taxed = without_tax_man.with_transaction(
        income(date(4, 25), bank(), "employer", "salary", dec!(10)).with_tax_credit(dec!(2)),
    );
    let err = AnalysisManager::new(taxed, Arc::new(MemoryMarketData::new()), AnalysisConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, AnalysisError::UnknownReference { .. }));
    assert!(err.is_data_consistency());
    Ok(())
}

#[test]
fn auto_expense_cash_spends_everything_it_receives() -> Result<()> {
    init_tracing();
    let wallet = AssetRef::cash("wallet");
    let dataset = household()
        .with_cash(Cash::new("wallet", "GBP").with_auto_expense("shop", "food"))
        .with_transaction(Transaction::new(
            date(2, 1),
            bank(),
            wallet.clone(),
            "transfer",
            dec!(200.00),
        ))
        .with_transaction(expense(date(2, 3), wallet.clone(), "landlord", "rent", dec!(50.00)));
    let manager = AnalysisManager::new(
        dataset,
        Arc::new(MemoryMarketData::new()),
        AnalysisConfig::default(),
    )?;
    let full = manager.full_analysis()?;

    assert_eq!(full.account(&bank()).unwrap().valuation(), dec!(800.00));
    let cash = full.account(&wallet).unwrap();
    assert_eq!(cash.valuation(), Decimal::ZERO);
    assert_eq!(cash.value(AccountAttr::Spend), dec!(200.00));

    // The rent was paid out of money already counted as food spending.
    assert_eq!(full.payee(&Id::from("shop")).unwrap().expense(), dec!(150.00));
    assert_eq!(full.payee(&Id::from("landlord")).unwrap().expense(), dec!(50.00));
    let living = full.category(&Id::from("living")).unwrap();
    assert_eq!(living.total(CategoryAttr::Expense), dec!(200.00));
    Ok(())
}

#[test]
fn tags_count_and_sum_tagged_transactions() -> Result<()> {
    let dataset = household()
        .with_tag(TransactionTag::new("holiday"))
        .with_transaction(
            expense(date(8, 1), bank(), "shop", "groceries", dec!(40.00)).with_tag("holiday"),
        )
        .with_transaction(
            expense(date(8, 2), bank(), "landlord", "rent", dec!(300.00)).with_tag("holiday"),
        )
        .with_transaction(income(date(8, 3), bank(), "shop", "groceries", dec!(15.00)).with_tag("holiday"));
    let manager = AnalysisManager::new(
        dataset,
        Arc::new(MemoryMarketData::new()),
        AnalysisConfig::default(),
    )?;
    let full = manager.full_analysis()?;
    let tag = full.tag(&Id::from("holiday")).unwrap();
    assert_eq!(tag.count(), dec!(3));
    // A refund from a payee reduces tagged spending.
    assert_eq!(tag.value(TagAttr::Expense), dec!(325.00));
    assert_eq!(full.payee(&Id::from("shop")).unwrap().expense(), dec!(25.00));
    Ok(())
}
