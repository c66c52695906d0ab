use rust_decimal::Decimal;
use tracing::debug;

use super::Analysis;
use crate::buckets::{Bucket, TaxAmounts};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::market_data::MarketData;
use crate::models::{CategoryClass, Dataset, TaxBasisClass};
use crate::values::{AccountAttr, CategoryAttr, SecurityAttr};

/// Turn a freshly derived view into a reportable one.
///
/// Every step measures against the view's base, so this must run exactly
/// once on each view.
pub(crate) fn process_period(
    analysis: &mut Analysis,
    dataset: &Dataset,
    market: &dyn MarketData,
    config: &AnalysisConfig,
) -> Result<()> {
    let range = analysis.range();
    debug!(range = %range, "Processing period");

    for account in analysis.accounts.buckets_mut() {
        account.calculate_fluctuations(range, market.rates())?;
        account.calculate_delta();
    }
    for portfolio in analysis.portfolios.iter_mut() {
        portfolio.analyse(range, market.prices(), market.rates())?;
    }

    book_virtual_categories(analysis, dataset)?;
    mark_relevance(analysis);

    for payee in analysis.payees.buckets_mut() {
        payee.calculate_delta();
    }
    for category in analysis.categories.iter_mut() {
        category.calculate_delta();
    }
    for tag in analysis.tags.buckets_mut() {
        tag.calculate_delta();
    }

    analysis.categories.rollup(dataset)?;
    analysis.tax_bases.rollup();
    analysis.accounts.recompute_totals();
    analysis.portfolios.recompute_totals();
    analysis.payees.recompute_totals();
    analysis.tags.recompute_totals();

    if config.prune_idle {
        analysis.accounts.prune();
        analysis.portfolios.prune();
        analysis.payees.prune();
        analysis.categories.prune();
        analysis.tax_bases.prune();
        analysis.tags.prune();
    }
    Ok(())
}

/// Relevance is a property of the view: a holding sold out in March is
/// relevant as of February.
fn mark_relevance(analysis: &mut Analysis) {
    for account in analysis.accounts.buckets_mut() {
        let active = account.is_active();
        account.set_relevant(active);
    }
    for portfolio in analysis.portfolios.iter_mut() {
        let active = portfolio.cash().is_active();
        portfolio.cash_mut().set_relevant(active);
        for holding in portfolio.holdings_mut() {
            let active = holding.is_active();
            holding.set_relevant(active);
        }
    }
}

/// Growth and currency movement of the period, which no transaction books,
/// shown against the dataset's MarketGrowth and CurrencyFluctuation
/// categories. Realised gains are left out of growth; they already sit in the
/// capital gain categories.
fn book_virtual_categories(analysis: &mut Analysis, dataset: &Dataset) -> Result<()> {
    let mut growth = Decimal::ZERO;
    let mut fluctuation = Decimal::ZERO;
    for portfolio in analysis.portfolios.iter() {
        fluctuation += portfolio.cash().value(AccountAttr::CurrencyFluct);
        for holding in portfolio.holdings() {
            let currency = holding.value(SecurityAttr::CurrencyFluct);
            growth += holding.value(SecurityAttr::MarketGrowth)
                - currency
                - holding.value(SecurityAttr::RealisedGains);
            fluctuation += currency;
        }
    }
    for account in analysis.accounts.buckets() {
        fluctuation += account.value(AccountAttr::CurrencyFluct);
    }

    for (class, amount) in [
        (CategoryClass::MarketGrowth, growth),
        (CategoryClass::CurrencyFluctuation, fluctuation),
    ] {
        if amount.is_zero() {
            continue;
        }
        let Some(category) = dataset.find_singular_category(class) else {
            continue;
        };
        let bucket = analysis.categories.get_or_create(category, dataset)?;
        if amount > Decimal::ZERO {
            bucket.adjust(CategoryAttr::Income, amount);
        } else {
            bucket.adjust(CategoryAttr::Expense, -amount);
        }
        analysis
            .tax_bases
            .adjust_untracked(TaxBasisClass::Market, TaxAmounts::untaxed(amount));
        debug!(class = ?class, amount = %amount, "Booked virtual category");
    }
    Ok(())
}
