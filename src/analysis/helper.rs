use rust_decimal::Decimal;

use crate::buckets::Movement;
use crate::error::Result;
use crate::history::TransactionKey;
use crate::market_data::{effective_rate, from_local, to_local, RateLookup};
use crate::models::{
    AssetRef, CategoryClass, Currency, Dataset, Direction, Transaction, TransactionCategory,
};

/// One side of a resolved transaction.
#[derive(Debug, Clone)]
pub struct Side<'a> {
    pub asset: &'a AssetRef,
    pub currency: Currency,
    /// `currency` to reporting currency on the transaction date.
    pub rate: Decimal,
    /// Amount in `currency`.
    pub amount: Decimal,
    pub units: Option<Decimal>,
}

impl Side<'_> {
    pub fn movement(&self, local: Decimal, class: CategoryClass) -> Movement {
        Movement {
            amount: self.amount,
            local,
            rate: self.rate,
            class,
        }
    }
}

/// Cash paid out alongside a corporate action, resolved to its receiving account.
#[derive(Debug, Clone)]
pub struct ResolvedCash<'a> {
    pub account: &'a AssetRef,
    /// In the receiving account's currency.
    pub amount: Decimal,
    pub local: Decimal,
    pub rate: Decimal,
}

impl ResolvedCash<'_> {
    pub fn movement(&self, class: CategoryClass) -> Movement {
        Movement {
            amount: self.amount,
            local: self.local,
            rate: self.rate,
            class,
        }
    }
}

/// A transaction with both sides resolved and every money field converted
/// at the rates effective on its date.
#[derive(Debug, Clone)]
pub struct TransactionHelper<'a> {
    pub transaction: &'a Transaction,
    pub key: TransactionKey,
    pub category: &'a TransactionCategory,
    pub class: CategoryClass,
    /// The transaction amount in the reporting currency.
    pub local: Decimal,
    pub debit: Side<'a>,
    pub credit: Side<'a>,
    pub tax_credit: Decimal,
    pub nat_insurance: Decimal,
    pub deemed_benefit: Decimal,
    pub withheld: Decimal,
    pub returned_cash: Option<ResolvedCash<'a>>,
}

impl<'a> TransactionHelper<'a> {
    pub fn new(
        transaction: &'a Transaction,
        seq: usize,
        dataset: &'a Dataset,
        rates: &dyn RateLookup,
        reporting: &Currency,
    ) -> Result<Self> {
        let date = transaction.date;
        let category = dataset.category(&transaction.category)?;
        let rate_for = |currency: &Currency, needed: bool| -> Result<Decimal> {
            if needed {
                effective_rate(rates, currency, reporting, date)
            } else {
                Ok(Decimal::ONE)
            }
        };

        let tax_fields = [
            transaction.tax_credit,
            transaction.nat_insurance,
            transaction.deemed_benefit,
            transaction.withheld,
            transaction.returned_cash.as_ref().map(|c| c.amount),
        ];
        let account_currency = dataset.asset_currency(&transaction.account, reporting)?;
        let account_rate = rate_for(
            &account_currency,
            !transaction.amount.is_zero() || tax_fields.iter().flatten().any(|v| !v.is_zero()),
        )?;
        let local = to_local(transaction.amount, account_rate, reporting);

        let partner_currency = dataset.asset_currency(&transaction.partner, reporting)?;
        let partner_rate = rate_for(
            &partner_currency,
            !local.is_zero() || transaction.partner_amount.is_some_and(|a| !a.is_zero()),
        )?;
        let partner_amount = match transaction.partner_amount {
            Some(amount) => amount,
            None => from_local(local, partner_rate, &partner_currency)?,
        };

        let account = Side {
            asset: &transaction.account,
            currency: account_currency,
            rate: account_rate,
            amount: transaction.amount,
            units: transaction.account_delta_units,
        };
        let partner = Side {
            asset: &transaction.partner,
            currency: partner_currency,
            rate: partner_rate,
            amount: partner_amount,
            units: transaction.partner_delta_units,
        };
        let (debit, credit) = match transaction.direction {
            Direction::To => (account, partner),
            Direction::From => (partner, account),
        };

        let convert = |value: Option<Decimal>| {
            value
                .map(|v| to_local(v, account_rate, reporting))
                .unwrap_or_default()
        };

        let returned_cash = match &transaction.returned_cash {
            Some(cash) => {
                let cash_local = to_local(cash.amount, account_rate, reporting);
                let currency = dataset.asset_currency(&cash.account, reporting)?;
                let rate = rate_for(&currency, !cash_local.is_zero())?;
                let amount = match cash.partner_amount {
                    Some(amount) => amount,
                    None => from_local(cash_local, rate, &currency)?,
                };
                Some(ResolvedCash {
                    account: &cash.account,
                    amount,
                    local: cash_local,
                    rate,
                })
            }
            None => None,
        };

        Ok(Self {
            transaction,
            key: TransactionKey::new(seq, date),
            category,
            class: category.class,
            local,
            debit,
            credit,
            tax_credit: convert(transaction.tax_credit),
            nat_insurance: convert(transaction.nat_insurance),
            deemed_benefit: convert(transaction.deemed_benefit),
            withheld: convert(transaction.withheld),
            returned_cash,
        })
    }

    /// Income before tax credit, National Insurance, deemed benefit and
    /// withholding were taken off.
    pub fn gross(&self) -> Decimal {
        self.local + self.tax_credit + self.nat_insurance + self.deemed_benefit + self.withheld
    }

    /// Amount paid to the tax authority on the payee's behalf.
    pub fn tax_paid(&self) -> Decimal {
        self.tax_credit + self.nat_insurance
    }

    pub fn returned_cash_local(&self) -> Decimal {
        self.returned_cash
            .as_ref()
            .map(|c| c.local)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::MemoryMarketData;
    use crate::models::{Deposit, Payee, PayeeClass, Portfolio, Security};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::new()
            .with_deposit(Deposit::new("bank", "GBP"))
            .with_deposit(Deposit::new("dollars", "USD"))
            .with_portfolio(Portfolio::new("gia", "GBP"))
            .with_security(Security::new("spy", "USD", "spdr"))
            .with_payee(Payee::new("employer", PayeeClass::Employer))
            .with_category(TransactionCategory::new("salary", CategoryClass::TaxedIncome))
            .with_category(TransactionCategory::new("transfer", CategoryClass::Transfer))
    }

    #[test]
    fn income_from_payee_resolves_credit_to_account() -> Result<()> {
        let data = dataset();
        let market = MemoryMarketData::new();
        let gbp = Currency::new("GBP");
        let tx = Transaction::new(
            date(),
            AssetRef::deposit("bank"),
            AssetRef::payee("employer"),
            "salary",
            dec!(1000),
        )
        .with_direction(Direction::From)
        .with_tax_credit(dec!(250))
        .with_nat_insurance(dec!(80));

        let helper = TransactionHelper::new(&tx, 3, &data, &market, &gbp)?;
        assert_eq!(helper.debit.asset, &AssetRef::payee("employer"));
        assert_eq!(helper.credit.asset, &AssetRef::deposit("bank"));
        assert_eq!(helper.local, dec!(1000));
        assert_eq!(helper.gross(), dec!(1330));
        assert_eq!(helper.tax_paid(), dec!(330));
        assert_eq!(helper.key, TransactionKey::new(3, date()));
        Ok(())
    }

    #[test]
    fn foreign_purchase_converts_each_side() -> Result<()> {
        let data = dataset();
        let market = MemoryMarketData::new().with_rate("USD", date(), dec!(0.80));
        let gbp = Currency::new("GBP");
        let tx = Transaction::new(
            date(),
            AssetRef::holding("gia", "spy"),
            AssetRef::deposit("dollars"),
            "transfer",
            dec!(1000),
        )
        .with_direction(Direction::From)
        .with_account_units(dec!(100));

        let helper = TransactionHelper::new(&tx, 0, &data, &market, &gbp)?;
        assert_eq!(helper.local, dec!(800));
        assert_eq!(helper.credit.amount, dec!(1000));
        assert_eq!(helper.credit.units, Some(dec!(100)));
        assert_eq!(helper.debit.amount, dec!(1000));
        assert_eq!(helper.debit.rate, dec!(0.80));
        Ok(())
    }

    #[test]
    fn missing_rate_is_a_lookup_miss() {
        let data = dataset();
        let market = MemoryMarketData::new();
        let tx = Transaction::new(
            date(),
            AssetRef::deposit("dollars"),
            AssetRef::deposit("bank"),
            "transfer",
            dec!(10),
        );
        let err = TransactionHelper::new(&tx, 0, &data, &market, &Currency::new("GBP")).unwrap_err();
        assert!(err.is_lookup_miss());
    }
}
