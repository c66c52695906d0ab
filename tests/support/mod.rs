#![allow(dead_code)]

use std::collections::BTreeMap;

use bucketbook::analysis::Analysis;
use bucketbook::buckets::Bucket;
use bucketbook::market_data::MemoryMarketData;
use bucketbook::models::{
    AssetRef, CategoryClass, Dataset, Deposit, Direction, Payee, PayeeClass, Portfolio, Security,
    Transaction, TransactionCategory,
};
use bucketbook::values::Attribute;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Route `tracing` output through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

/// A GBP household: one bank account, a general and a tax-free portfolio,
/// the usual payees and every singular category.
pub fn household() -> Dataset {
    let categories = [
        ("salary", CategoryClass::TaxedIncome, None),
        ("dividends", CategoryClass::Dividend, None),
        ("interest", CategoryClass::Interest, None),
        ("living", CategoryClass::Parent, None),
        ("food", CategoryClass::Expense, Some("living")),
        ("groceries", CategoryClass::Expense, Some("food")),
        ("rent", CategoryClass::Expense, Some("living")),
        ("transfer", CategoryClass::Transfer, None),
        ("split", CategoryClass::StockSplit, None),
        ("demerger", CategoryClass::StockDeMerger, None),
        ("takeover", CategoryClass::StockTakeOver, None),
        ("return-of-capital", CategoryClass::ReturnOfCapital, None),
        ("policy-gain", CategoryClass::ChargeableGain, None),
        ("portfolio-move", CategoryClass::PortfolioXfer, None),
        ("capital-gains", CategoryClass::CapitalGain, None),
        ("tax-credit", CategoryClass::TaxCredit, None),
        ("national-insurance", CategoryClass::NatInsurance, None),
        ("deemed-benefit", CategoryClass::DeemedBenefit, None),
        ("withheld", CategoryClass::Withheld, None),
        ("market-growth", CategoryClass::MarketGrowth, None),
        ("currency", CategoryClass::CurrencyFluctuation, None),
    ];
    let mut dataset = Dataset::new()
        .with_default_currency("GBP")
        .with_deposit(Deposit::new("bank", "GBP").with_opening_balance(dec!(1000.00)))
        .with_portfolio(Portfolio::new("gia", "GBP"))
        .with_portfolio(Portfolio::new("isa", "GBP").tax_free())
        .with_security(Security::new("acme", "GBP", "acme-plc"))
        .with_security(Security::new("newco", "GBP", "newco-plc"))
        .with_security(Security::new("spinco", "GBP", "spinco-plc"))
        .with_security(Security::new("spy", "USD", "spdr"))
        .with_payee(Payee::new("hmrc", PayeeClass::TaxMan))
        .with_payee(Payee::new("employer", PayeeClass::Employer))
        .with_payee(Payee::new("shop", PayeeClass::Other))
        .with_payee(Payee::new("landlord", PayeeClass::Individual))
        .with_payee(Payee::new("acme-plc", PayeeClass::Institution))
        .with_payee(Payee::new("newco-plc", PayeeClass::Institution))
        .with_payee(Payee::new("spinco-plc", PayeeClass::Institution))
        .with_payee(Payee::new("spdr", PayeeClass::Institution));
    for (id, class, parent) in categories {
        let mut category = TransactionCategory::new(id, class);
        if let Some(parent) = parent {
            category = category.with_parent(parent);
        }
        dataset = dataset.with_category(category);
    }
    dataset
}

/// Money from `payee` into `account`.
pub fn income(day: NaiveDate, account: AssetRef, payee: &str, category: &str, amount: Decimal) -> Transaction {
    Transaction::new(day, account, AssetRef::payee(payee), category, amount)
        .with_direction(Direction::From)
}

/// Money from `account` to `payee`.
pub fn expense(day: NaiveDate, account: AssetRef, payee: &str, category: &str, amount: Decimal) -> Transaction {
    Transaction::new(day, account, AssetRef::payee(payee), category, amount)
}

/// Cash from the portfolio into a holding in exchange for `units`.
pub fn buy(day: NaiveDate, portfolio: &str, security: &str, units: Decimal, amount: Decimal) -> Transaction {
    Transaction::new(
        day,
        AssetRef::holding(portfolio, security),
        AssetRef::portfolio(portfolio),
        "transfer",
        amount,
    )
    .with_direction(Direction::From)
    .with_account_units(units)
}

/// Units out of a holding, proceeds into the portfolio's cash.
pub fn sell(day: NaiveDate, portfolio: &str, security: &str, units: Decimal, amount: Decimal) -> Transaction {
    Transaction::new(
        day,
        AssetRef::holding(portfolio, security),
        AssetRef::portfolio(portfolio),
        "transfer",
        amount,
    )
    .with_account_units(units)
}

/// Flat prices for every GBP security across 2024.
pub fn flat_prices() -> MemoryMarketData {
    MemoryMarketData::new()
        .with_price("acme", date(1, 1), dec!(20))
        .with_price("newco", date(1, 1), dec!(60))
        .with_price("spinco", date(1, 1), dec!(25))
}

/// Every value of every bucket, keyed by bucket and attribute, for comparing
/// analyses built along different paths.
pub fn summary(analysis: &Analysis) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut put = |key: String, value: String| {
        out.insert(key, value);
    };
    for (asset, bucket) in analysis.accounts().iter() {
        for (attr, value) in bucket.values().iter() {
            put(format!("account/{asset}/{}", attr.name()), render(value));
        }
    }
    for portfolio in analysis.portfolios().iter() {
        for (attr, value) in portfolio.cash().values().iter() {
            put(format!("portfolio/{}/cash/{}", portfolio.id(), attr.name()), render(value));
        }
        for holding in portfolio.holdings() {
            for (attr, value) in holding.values().iter() {
                put(format!("holding/{}/{}", holding.holding(), attr.name()), render(value));
            }
        }
    }
    for (id, bucket) in analysis.payees().iter() {
        for (attr, value) in bucket.values().iter() {
            put(format!("payee/{id}/{}", attr.name()), render(value));
        }
    }
    for bucket in analysis.categories().iter() {
        for (attr, value) in bucket.totals().iter() {
            put(format!("category/{}/{}", bucket.full_name(), attr.name()), render(value));
        }
    }
    for bucket in analysis.tax_bases().iter() {
        for (attr, value) in bucket.values().iter() {
            put(format!("tax/{}/{}", bucket.class().name(), attr.name()), render(value));
        }
    }
    for (id, bucket) in analysis.tags().iter() {
        for (attr, value) in bucket.values().iter() {
            put(format!("tag/{id}/{}", attr.name()), render(value));
        }
    }
    out
}

fn render(value: &bucketbook::values::Value) -> String {
    match value.decimal() {
        Some(amount) => amount.normalize().to_string(),
        None => value.to_string(),
    }
}
