mod support;

use std::sync::Arc;

use anyhow::Result;
use bucketbook::buckets::Bucket;
use bucketbook::market_data::MemoryMarketData;
use bucketbook::models::{AssetRef, Dataset, DateRange, HoldingId, Id, TaxBasisClass};
use bucketbook::values::{CategoryAttr, SecurityAttr, TaxBasisAttr};
use bucketbook::{AnalysisConfig, AnalysisManager};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use support::{buy, date, expense, flat_prices, household, income, init_tracing, sell, summary};

fn bank() -> AssetRef {
    AssetRef::deposit("bank")
}

fn ledger() -> Dataset {
    household()
        .with_transaction(income(date(1, 5), bank(), "employer", "salary", dec!(2000.00)))
        .with_transaction(expense(date(1, 8), bank(), "shop", "groceries", dec!(120.00)))
        .with_transaction(expense(date(1, 8), bank(), "landlord", "rent", dec!(700.00)))
        .with_transaction(buy(date(2, 1), "gia", "acme", dec!(50), dec!(1000.00)))
        .with_transaction(income(date(2, 5), bank(), "employer", "salary", dec!(2000.00)))
        .with_transaction(expense(date(2, 9), bank(), "shop", "groceries", dec!(80.00)))
        .with_transaction(sell(date(3, 1), "gia", "acme", dec!(10), dec!(200.00)))
        .with_transaction(expense(date(3, 4), bank(), "landlord", "rent", dec!(700.00)))
}

fn manager(dataset: Dataset) -> Result<AnalysisManager> {
    Ok(AnalysisManager::new(
        dataset,
        Arc::new(flat_prices()),
        AnalysisConfig::default(),
    )?)
}

#[test]
fn dated_view_matches_a_fresh_build_of_the_same_prefix() -> Result<()> {
    init_tracing();
    let dataset = ledger();
    let full = manager(dataset.clone())?;

    for cut in [date(1, 5), date(1, 8), date(2, 1), date(2, 9)] {
        let dated = full.analysis_as_of(cut)?;
        let fresh = manager(dataset.filtered(|t| t.date <= cut))?.full_analysis()?;
        assert_eq!(summary(&dated), summary(&fresh), "views differ as of {cut}");
    }
    Ok(())
}

#[test]
fn dated_view_between_transactions_values_holdings_at_the_cut() -> Result<()> {
    init_tracing();
    let dataset = household()
        .with_transaction(buy(date(2, 1), "gia", "acme", dec!(10), dec!(200.00)))
        .with_transaction(sell(date(3, 1), "gia", "acme", dec!(5), dec!(150.00)));
    let market = || Arc::new(flat_prices().with_price("acme", date(2, 10), dec!(30)));
    let cut = date(2, 15);

    let dated = AnalysisManager::new(dataset.clone(), market(), AnalysisConfig::default())?
        .analysis_as_of(cut)?;
    let prefix = dataset.filtered(|t| t.date <= cut).with_end_date(cut);
    let fresh = AnalysisManager::new(prefix, market(), AnalysisConfig::default())?.full_analysis()?;

    assert_eq!(fresh.range(), DateRange::new(date(2, 1), cut));
    assert_eq!(dated.range(), fresh.range());
    assert_eq!(summary(&dated), summary(&fresh));

    let holding = dated.holding(&HoldingId::new("gia", "acme")).unwrap();
    assert_eq!(holding.value(SecurityAttr::Valuation), dec!(300.00));
    assert_eq!(holding.value(SecurityAttr::Profit), dec!(100.00));
    assert_eq!(
        dated
            .category(&Id::from("market-growth"))
            .unwrap()
            .value(CategoryAttr::Income),
        dec!(100.00)
    );
    Ok(())
}

#[test]
fn ranged_view_measures_flows_from_range_start() -> Result<()> {
    init_tracing();
    let manager = manager(ledger())?;
    let february = manager.analysis_for_range(DateRange::new(date(2, 1), date(2, 29)))?;

    // Balances carry forward, flows restart.
    assert_eq!(february.account(&bank()).unwrap().valuation(), dec!(4100.00));
    assert_eq!(february.payee(&Id::from("employer")).unwrap().income(), dec!(2000.00));
    assert_eq!(february.payee(&Id::from("shop")).unwrap().expense(), dec!(80.00));
    assert!(february.payee(&Id::from("landlord")).is_none());
    assert_eq!(
        february
            .tax_basis(TaxBasisClass::Salary)
            .unwrap()
            .value(TaxBasisAttr::Gross),
        dec!(2000.00)
    );

    let holding = february.holding(&HoldingId::new("gia", "acme")).unwrap();
    assert_eq!(holding.units(), dec!(50));
    assert_eq!(holding.value(SecurityAttr::Invested), dec!(1000.00));
    assert_eq!(holding.value(SecurityAttr::Valuation), dec!(1000.00));

    let march = manager.analysis_for_range(DateRange::new(date(3, 1), date(3, 31)))?;
    let holding = march.holding(&HoldingId::new("gia", "acme")).unwrap();
    assert_eq!(holding.units(), dec!(40));
    assert_eq!(holding.value(SecurityAttr::Invested), dec!(-200.00));
    assert_eq!(holding.value(SecurityAttr::RealisedGains), Decimal::ZERO);
    assert_eq!(holding.value(SecurityAttr::ValueDelta), dec!(-200.00));
    assert_eq!(holding.value(SecurityAttr::Profit), Decimal::ZERO);
    Ok(())
}

#[test]
fn categories_roll_up_at_every_depth() -> Result<()> {
    let manager = manager(ledger())?;
    let full = manager.full_analysis()?;

    let total = |id: &str| full.category(&Id::from(id)).unwrap().total(CategoryAttr::Expense);
    assert_eq!(total("groceries"), dec!(200.00));
    assert_eq!(total("food"), dec!(200.00));
    assert_eq!(total("rent"), dec!(1400.00));
    assert_eq!(total("living"), dec!(1600.00));

    let living = full.category(&Id::from("living")).unwrap();
    assert_eq!(living.depth(), 0);
    assert_eq!(living.value(CategoryAttr::Expense), Decimal::ZERO);
    assert_eq!(living.total(CategoryAttr::Profit), dec!(-1600.00));
    assert_eq!(
        full.category(&Id::from("groceries")).unwrap().full_name(),
        "living:food:groceries"
    );

    let expense = full.tax_basis(TaxBasisClass::Expense).unwrap();
    assert_eq!(expense.value(TaxBasisAttr::Gross), dec!(1600.00));
    assert_eq!(
        expense.account(&bank()).unwrap().value(TaxBasisAttr::Gross),
        dec!(1600.00)
    );
    Ok(())
}

#[test]
fn views_leave_the_raw_analysis_untouched() -> Result<()> {
    let manager = manager(ledger())?;
    let before = summary(manager.raw_analysis());

    let first = manager.full_analysis()?;
    manager.analysis_as_of(date(2, 1))?;
    manager.analysis_for_range(DateRange::new(date(1, 6), date(2, 10)))?;
    let second = manager.full_analysis()?;

    assert_eq!(summary(manager.raw_analysis()), before);
    assert_eq!(summary(&first), summary(&second));
    Ok(())
}

#[test]
fn idle_buckets_are_pruned_only_when_configured() -> Result<()> {
    let dataset = ledger();
    let cut = date(1, 6);

    let pruned = manager(dataset.clone())?.analysis_as_of(cut)?;
    assert!(pruned.payee(&Id::from("landlord")).is_none());
    assert!(pruned.portfolios().get(&Id::from("gia")).is_none());

    let kept = AnalysisManager::new(
        dataset,
        Arc::new(MemoryMarketData::new()),
        AnalysisConfig::default().with_prune_idle(false),
    )?
    .analysis_as_of(cut)?;
    let landlord = kept.payee(&Id::from("landlord")).unwrap();
    assert_eq!(landlord.expense(), Decimal::ZERO);
    Ok(())
}
