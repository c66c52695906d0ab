mod support;

use std::sync::Arc;

use anyhow::Result;
use bucketbook::models::{AssetRef, Dataset, Id};
use bucketbook::{AnalysisConfig, AnalysisManager};
use rust_decimal_macros::dec;
use support::{buy, date, expense, flat_prices, household, income, init_tracing, sell, summary};

fn bank() -> AssetRef {
    AssetRef::deposit("bank")
}

fn ledger() -> Dataset {
    household()
        .with_transaction(income(date(1, 5), bank(), "employer", "salary", dec!(2000.00)))
        .with_transaction(buy(date(1, 20), "gia", "acme", dec!(100), dec!(2000.00)))
        .with_transaction(expense(date(2, 3), bank(), "shop", "groceries", dec!(60.00)))
        .with_transaction(income(date(2, 5), bank(), "employer", "salary", dec!(2000.00)))
        .with_transaction(sell(date(3, 1), "gia", "acme", dec!(40), dec!(900.00)))
        .with_transaction(expense(date(3, 2), bank(), "landlord", "rent", dec!(750.00)))
}

fn manager(dataset: Dataset) -> Result<AnalysisManager> {
    Ok(AnalysisManager::new(
        dataset,
        Arc::new(flat_prices()),
        AnalysisConfig::default(),
    )?)
}

/// The February salary goes up and a March purchase is added.
fn edited() -> Dataset {
    let mut dataset = ledger().filtered(|t| t.date < date(2, 5));
    for transaction in [
        income(date(2, 5), bank(), "employer", "salary", dec!(2100.00)),
        sell(date(3, 1), "gia", "acme", dec!(40), dec!(900.00)),
        expense(date(3, 2), bank(), "landlord", "rent", dec!(750.00)),
        buy(date(3, 10), "isa", "newco", dec!(5), dec!(300.00)),
    ] {
        dataset = dataset.with_transaction(transaction);
    }
    dataset
}

#[test]
fn incremental_pass_matches_a_full_pass() -> Result<()> {
    init_tracing();
    let mut incremental = manager(ledger())?;
    incremental.reanalyse_from(edited(), date(2, 5))?;
    let fresh = manager(edited())?;

    assert_eq!(
        summary(&incremental.full_analysis()?),
        summary(&fresh.full_analysis()?)
    );
    assert_eq!(
        summary(&incremental.analysis_as_of(date(3, 1))?),
        summary(&fresh.analysis_as_of(date(3, 1))?)
    );

    let full = incremental.full_analysis()?;
    assert_eq!(full.account(&bank()).unwrap().valuation(), dec!(4290.00));
    assert_eq!(full.payee(&Id::from("employer")).unwrap().income(), dec!(4100.00));
    Ok(())
}

#[test]
fn edit_before_the_first_transaction_runs_a_full_pass() -> Result<()> {
    let mut incremental = manager(ledger())?;
    let earlier = edited().with_transaction(expense(date(1, 2), bank(), "shop", "groceries", dec!(5.00)));
    incremental.reanalyse_from(earlier.clone(), date(1, 2))?;

    let fresh = manager(earlier)?;
    assert_eq!(
        summary(&incremental.full_analysis()?),
        summary(&fresh.full_analysis()?)
    );
    assert_eq!(incremental.dataset().analysis_range(), fresh.dataset().analysis_range());
    Ok(())
}
