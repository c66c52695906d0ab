use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::helper::TransactionHelper;
use super::Analysis;
use crate::buckets::{
    AccountBucket, AccountVariant, Bucket, ChargeableGainSlice, PayeeBucket, PortfolioBucket,
    SecurityBucket, TaxAmounts, TransactionTagBucket,
};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::market_data::{effective_rate, from_local, MarketData, RateLookup};
use crate::models::{
    AssetRef, AutoExpense, CategoryClass, Currency, Dataset, HoldingId, Id, SecurityClass,
    TaxBasisClass, Transaction, TransactionCategory,
};
use crate::values::{CategoryAttr, PayeeAttr, SecurityAttr};

/// Shape of a transaction's asset pair, which decides how it is booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Income, expense or transfer between accounts and payees.
    Standard,
    /// One side is a cash account that spends everything it receives.
    AutoExpense,
    /// Money leaves a holding: sales, dividends, distributions.
    DebitSecurity,
    /// Money arrives in a holding: purchases, income paid in units.
    CreditSecurity,
    /// Both sides are holdings: splits, de-mergers, takeovers, reinvestment.
    BothSecurity,
    /// Everything in one portfolio moves to another.
    PortfolioXfer,
}

/// Classify a resolved transaction by its asset pair.
pub fn classify(helper: &TransactionHelper<'_>, dataset: &Dataset) -> Result<Branch> {
    let debit = helper.debit.asset;
    let credit = helper.credit.asset;
    let branch = match (debit, credit) {
        (AssetRef::Portfolio(_), AssetRef::Portfolio(_))
            if helper.class == CategoryClass::PortfolioXfer =>
        {
            Branch::PortfolioXfer
        }
        (AssetRef::Holding(_), AssetRef::Holding(_)) => Branch::BothSecurity,
        (AssetRef::Holding(_), _) => Branch::DebitSecurity,
        (_, AssetRef::Holding(_)) => Branch::CreditSecurity,
        _ => {
            let debit_auto = auto_expense(dataset, debit)?.is_some();
            let credit_auto = auto_expense(dataset, credit)?.is_some();
            if debit_auto != credit_auto {
                Branch::AutoExpense
            } else {
                Branch::Standard
            }
        }
    };
    Ok(branch)
}

fn auto_expense<'d>(dataset: &'d Dataset, asset: &AssetRef) -> Result<Option<&'d AutoExpense>> {
    match asset {
        AssetRef::Cash(id) => Ok(dataset.cash(id)?.auto_expense.as_ref()),
        _ => Ok(None),
    }
}

fn invalid_pair(helper: &TransactionHelper<'_>) -> AnalysisError {
    AnalysisError::InvalidAssetPair {
        transaction: helper.transaction.id.clone(),
        debit: helper.debit.asset.kind(),
        credit: helper.credit.asset.kind(),
        class: helper.class,
    }
}

fn missing_units(helper: &TransactionHelper<'_>) -> AnalysisError {
    AnalysisError::MissingUnits {
        transaction: helper.transaction.id.clone(),
        class: helper.class,
    }
}

/// Cost taken out of a holding by `cash` paid out of it.
///
/// Large payouts take cost in proportion to the cash's share of the total
/// consideration; small ones consume cost directly, never more than is left.
pub fn allocate_cost(
    large: bool,
    cash: Decimal,
    remaining_value: Decimal,
    cost: Decimal,
    currency: &Currency,
) -> Decimal {
    if cash <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let total = cash + remaining_value;
    if large && total > Decimal::ZERO {
        currency.round(cost * cash / total)
    } else {
        cash.min(cost)
    }
}

/// Bucket for a deposit, cash account or loan, seeded with its opening balance.
fn open_account(
    dataset: &Dataset,
    asset: &AssetRef,
    reporting: &Currency,
    rates: &dyn RateLookup,
    opening_date: NaiveDate,
) -> Result<AccountBucket> {
    let (name, variant, currency, opening, maturity, closed) = match asset {
        AssetRef::Deposit(id) => {
            let deposit = dataset.deposit(id)?;
            (
                &deposit.name,
                AccountVariant::Deposit(deposit.class),
                &deposit.currency,
                deposit.opening_balance,
                deposit.maturity,
                deposit.closed,
            )
        }
        AssetRef::Cash(id) => {
            let cash = dataset.cash(id)?;
            (
                &cash.name,
                AccountVariant::Cash {
                    auto_expense: cash.auto_expense.is_some(),
                },
                &cash.currency,
                cash.opening_balance,
                None,
                cash.closed,
            )
        }
        AssetRef::Loan(id) => {
            let loan = dataset.loan(id)?;
            (
                &loan.name,
                AccountVariant::Loan(loan.class),
                &loan.currency,
                loan.opening_balance,
                None,
                loan.closed,
            )
        }
        other => {
            return Err(AnalysisError::UnknownReference {
                kind: "account",
                id: other.to_string(),
            })
        }
    };
    let mut bucket = AccountBucket::new(
        asset.clone(),
        name.clone(),
        variant,
        currency.clone(),
        reporting,
    )
    .closed(closed);
    if let Some(balance) = opening.filter(|b| !b.is_zero()) {
        let rate = effective_rate(rates, currency, reporting, opening_date)?;
        bucket = bucket.with_opening_balance(balance, rate);
    }
    if let Some(maturity) = maturity {
        bucket = bucket.with_maturity(maturity);
    }
    Ok(bucket)
}

/// The single forward pass that turns a ledger into a raw [`Analysis`].
pub struct TransactionAnalyser<'a> {
    dataset: &'a Dataset,
    market: &'a dyn MarketData,
    config: &'a AnalysisConfig,
    analysis: Analysis,
}

impl<'a> TransactionAnalyser<'a> {
    /// Analyser over `dataset` with every account and portfolio opened.
    pub fn new(
        dataset: &'a Dataset,
        market: &'a dyn MarketData,
        config: &'a AnalysisConfig,
    ) -> Result<Self> {
        let currency = config.reporting_currency(dataset.default_currency());
        let range = dataset.analysis_range().ok_or(AnalysisError::EmptyDataset)?;
        Self::with_analysis(dataset, market, config, Analysis::new(currency, range))
    }

    fn with_analysis(
        dataset: &'a Dataset,
        market: &'a dyn MarketData,
        config: &'a AnalysisConfig,
        analysis: Analysis,
    ) -> Result<Self> {
        let mut analyser = Self {
            dataset,
            market,
            config,
            analysis,
        };
        analyser.open_accounts()?;
        Ok(analyser)
    }

    /// Build the raw analysis of every live transaction in `dataset`.
    pub fn run(
        dataset: &'a Dataset,
        market: &'a dyn MarketData,
        config: &'a AnalysisConfig,
    ) -> Result<Analysis> {
        let mut analyser = Self::new(dataset, market, config)?;
        let transactions = dataset.sorted_transactions();
        info!(
            transactions = transactions.len(),
            currency = %analyser.analysis.currency(),
            range = %analyser.analysis.range(),
            "Starting analysis pass"
        );
        for (seq, transaction) in transactions.into_iter().enumerate() {
            analyser.analyse_transaction(seq, transaction)?;
        }
        analyser.finish()
    }

    /// Rebuild `base` after the transactions dated `date` or later changed.
    ///
    /// Everything before `date` is taken from `base` as it stood the day
    /// before; only the remaining transactions of `dataset` are replayed.
    /// Transactions dated before `date` must be the ones `base` was built from.
    pub fn reanalyse_from(
        base: &Analysis,
        dataset: &'a Dataset,
        market: &'a dyn MarketData,
        config: &'a AnalysisConfig,
        date: NaiveDate,
    ) -> Result<Analysis> {
        let range = dataset.analysis_range().ok_or(AnalysisError::EmptyDataset)?;
        let mut analysis = base.derive_as_of(date - Duration::days(1));
        analysis.set_range(range);
        let mut analyser = Self::with_analysis(dataset, market, config, analysis)?;

        let transactions = dataset.sorted_transactions();
        let first = transactions.partition_point(|t| t.date < date);
        info!(
            from = %date,
            kept = first,
            replayed = transactions.len() - first,
            "Re-analysing ledger"
        );
        for (seq, transaction) in transactions.into_iter().enumerate().skip(first) {
            analyser.analyse_transaction(seq, transaction)?;
        }
        analyser.finish()
    }

    fn finish(mut self) -> Result<Analysis> {
        self.post_process_analysis()?;
        info!(
            accounts = self.analysis.accounts.len(),
            portfolios = self.analysis.portfolios.len(),
            payees = self.analysis.payees.len(),
            categories = self.analysis.categories.len(),
            "Analysis pass complete"
        );
        Ok(self.analysis)
    }

    fn reporting(&self) -> Currency {
        self.analysis.currency().clone()
    }

    fn open_accounts(&mut self) -> Result<()> {
        let dataset = self.dataset;
        let market = self.market;
        let rates = market.rates();
        let reporting = self.reporting();
        let opening_date = self.analysis.range().start;

        let assets = dataset
            .deposits()
            .map(|d| AssetRef::Deposit(d.id.clone()))
            .chain(dataset.cash_accounts().map(|c| AssetRef::Cash(c.id.clone())))
            .chain(dataset.loans().map(|l| AssetRef::Loan(l.id.clone())));
        for asset in assets {
            if !self.analysis.accounts.contains(&asset) {
                let bucket = open_account(dataset, &asset, &reporting, rates, opening_date)?;
                self.analysis.accounts.insert(asset, bucket);
            }
        }
        for portfolio in dataset.portfolios() {
            if self.analysis.portfolios.get(&portfolio.id).is_none() {
                self.analysis
                    .portfolios
                    .insert(PortfolioBucket::new(portfolio, &reporting));
            }
        }
        Ok(())
    }

    fn analyse_transaction(&mut self, seq: usize, transaction: &Transaction) -> Result<()> {
        let dataset = self.dataset;
        let market = self.market;
        let reporting = self.reporting();
        let helper = TransactionHelper::new(transaction, seq, dataset, market.rates(), &reporting)?;
        let branch = classify(&helper, dataset)?;
        debug!(
            transaction = %transaction.id,
            date = %transaction.date,
            class = ?helper.class,
            branch = ?branch,
            local = %helper.local,
            "Analysing transaction"
        );

        if let Some(factor) = transaction.dilution {
            self.record_dilution(&helper, factor);
        }

        match branch {
            Branch::Standard => self.analyse_standard(&helper)?,
            Branch::AutoExpense => self.analyse_auto_expense(&helper)?,
            Branch::DebitSecurity => self.analyse_debit_security(&helper)?,
            Branch::CreditSecurity => self.analyse_credit_security(&helper)?,
            Branch::BothSecurity => self.analyse_both_security(&helper)?,
            Branch::PortfolioXfer => self.analyse_portfolio_transfer(&helper)?,
        }
        self.book_tags(&helper)
    }

    fn record_dilution(&mut self, helper: &TransactionHelper<'_>, factor: Decimal) {
        let holding = helper
            .debit
            .asset
            .holding_id()
            .or_else(|| helper.credit.asset.holding_id());
        match holding {
            Some(holding) => {
                self.analysis
                    .dilutions
                    .record(&holding.security, helper.key.date, factor)
            }
            None => warn!(
                transaction = %helper.transaction.id,
                factor = %factor,
                "Dilution factor on a transaction without a holding; ignored"
            ),
        }
    }

    // Bucket access

    fn account_mut(&mut self, asset: &AssetRef) -> Result<&mut AccountBucket> {
        if let AssetRef::Portfolio(id) = asset {
            return Ok(self.portfolio_mut(id)?.cash_mut());
        }
        let dataset = self.dataset;
        let market = self.market;
        let reporting = self.reporting();
        let opening_date = self.analysis.range().start;
        self.analysis.accounts.get_or_try_create(asset, || {
            open_account(dataset, asset, &reporting, market.rates(), opening_date)
        })
    }

    fn portfolio_mut(&mut self, id: &Id) -> Result<&mut PortfolioBucket> {
        if self.analysis.portfolios.get(id).is_none() {
            let dataset = self.dataset;
            let portfolio = dataset.portfolio(id)?;
            let reporting = self.reporting();
            self.analysis
                .portfolios
                .insert(PortfolioBucket::new(portfolio, &reporting));
        }
        self.analysis
            .portfolios
            .get_mut(id)
            .ok_or_else(|| AnalysisError::UnknownReference {
                kind: "portfolio",
                id: id.to_string(),
            })
    }

    fn holding_mut(&mut self, holding: &HoldingId) -> Result<&mut SecurityBucket> {
        let dataset = self.dataset;
        let security = dataset.security(&holding.security)?;
        Ok(self
            .portfolio_mut(&holding.portfolio)?
            .holding_or_create(security))
    }

    fn payee_mut(&mut self, id: &Id) -> Result<&mut PayeeBucket> {
        let dataset = self.dataset;
        let payee = dataset.payee(id)?;
        Ok(self
            .analysis
            .payees
            .get_or_create(id, || PayeeBucket::new(payee)))
    }

    fn issuer(&self, holding: &HoldingId) -> Result<Id> {
        Ok(self.dataset.security(&holding.security)?.issuer.clone())
    }

    fn rate(&self, currency: &Currency, date: NaiveDate) -> Result<Decimal> {
        effective_rate(self.market.rates(), currency, self.analysis.currency(), date)
    }

    /// Market value of `units` of `security` on `date`: (security currency, reporting currency).
    fn market_values(
        &self,
        security: &Id,
        currency: &Currency,
        units: Decimal,
        date: NaiveDate,
    ) -> Result<(Decimal, Decimal)> {
        if units.is_zero() {
            return Ok((Decimal::ZERO, Decimal::ZERO));
        }
        let price = self.market.prices().price_for_date(security, date)?;
        let rate = self.rate(currency, date)?;
        Ok((
            currency.round(units * price),
            self.analysis.currency().round(units * price * rate),
        ))
    }

    // Bookings shared by the branches

    fn book_payee(
        &mut self,
        helper: &TransactionHelper<'_>,
        payee: &Id,
        attr: PayeeAttr,
        amount: Decimal,
    ) -> Result<()> {
        let bucket = self.payee_mut(payee)?;
        bucket.adjust(attr, amount);
        bucket.register(helper.key, &helper.transaction.id)
    }

    fn book_category(
        &mut self,
        helper: &TransactionHelper<'_>,
        category: &TransactionCategory,
        attr: CategoryAttr,
        amount: Decimal,
    ) -> Result<()> {
        let dataset = self.dataset;
        let bucket = self.analysis.categories.get_or_create(category, dataset)?;
        bucket.adjust(attr, amount);
        bucket.register(helper.key, &helper.transaction.id)
    }

    fn book_singular(
        &mut self,
        helper: &TransactionHelper<'_>,
        class: CategoryClass,
        attr: CategoryAttr,
        amount: Decimal,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let dataset = self.dataset;
        let category = dataset.singular_category(class)?;
        self.book_category(helper, category, attr, amount)
    }

    fn book_tax_basis(
        &mut self,
        helper: &TransactionHelper<'_>,
        basis: Option<TaxBasisClass>,
        account: &AssetRef,
        amounts: TaxAmounts,
    ) -> Result<()> {
        let Some(basis) = basis else {
            return Ok(());
        };
        let basis = if self.dataset.is_tax_free(account)? {
            basis.within_tax_free_wrapper()
        } else {
            basis
        };
        self.analysis.tax_bases.book(
            basis,
            account,
            amounts,
            helper.key,
            &helper.transaction.id,
        )
    }

    /// Tax basis for income of `class` paid by a security of `security_class`.
    fn income_basis(class: CategoryClass, security_class: Option<SecurityClass>) -> Option<TaxBasisClass> {
        match (class.tax_basis(), security_class) {
            (Some(TaxBasisClass::Dividend), Some(SecurityClass::UnitTrust)) => {
                Some(TaxBasisClass::UnitTrustDividend)
            }
            (basis, _) => basis,
        }
    }

    /// Income from `payee` arriving in `account`; `sign` is -1 for repayments.
    fn book_income(
        &mut self,
        helper: &TransactionHelper<'_>,
        payee: &Id,
        account: &AssetRef,
        basis: Option<TaxBasisClass>,
        sign: Decimal,
    ) -> Result<()> {
        let gross = helper.gross() * sign;
        self.book_payee(helper, payee, PayeeAttr::Income, gross)?;
        self.book_category(helper, helper.category, CategoryAttr::Income, gross)?;

        let tax_paid = helper.tax_paid() * sign;
        if !tax_paid.is_zero() {
            let tax_man = self.dataset.tax_man()?.id.clone();
            self.book_payee(helper, &tax_man, PayeeAttr::Expense, tax_paid)?;
        }
        for (class, amount) in [
            (CategoryClass::TaxCredit, helper.tax_credit),
            (CategoryClass::NatInsurance, helper.nat_insurance),
            (CategoryClass::DeemedBenefit, helper.deemed_benefit),
            (CategoryClass::Withheld, helper.withheld),
        ] {
            self.book_singular(helper, class, CategoryAttr::Expense, amount * sign)?;
        }

        let amounts = TaxAmounts {
            gross,
            nett: helper.local * sign,
            tax_credit: helper.tax_credit * sign,
        };
        self.book_tax_basis(helper, basis, account, amounts)
    }

    /// Spending paid to `payee` out of `account`; `sign` is -1 for refunds.
    fn book_expense(
        &mut self,
        helper: &TransactionHelper<'_>,
        payee: &Id,
        account: &AssetRef,
        sign: Decimal,
    ) -> Result<()> {
        let amount = helper.local * sign;
        self.book_payee(helper, payee, PayeeAttr::Expense, amount)?;
        self.book_category(helper, helper.category, CategoryAttr::Expense, amount)?;
        self.book_tax_basis(
            helper,
            helper.class.tax_basis(),
            account,
            TaxAmounts::untaxed(amount),
        )
    }

    /// Realised gain (or loss) to the singular gain category and its basis.
    fn book_gain(
        &mut self,
        helper: &TransactionHelper<'_>,
        class: CategoryClass,
        account: &AssetRef,
        gain: Decimal,
    ) -> Result<()> {
        if gain.is_zero() {
            return Ok(());
        }
        if gain > Decimal::ZERO {
            self.book_singular(helper, class, CategoryAttr::Income, gain)?;
        } else {
            self.book_singular(helper, class, CategoryAttr::Expense, -gain)?;
        }
        self.book_tax_basis(helper, class.tax_basis(), account, TaxAmounts::untaxed(gain))
    }

    fn book_tags(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let transaction = helper.transaction;
        if transaction.tags.is_empty() {
            return Ok(());
        }
        let (income, expense) = if helper.class.is_income() {
            let sign = if helper.credit.asset.is_payee() {
                Decimal::NEGATIVE_ONE
            } else {
                Decimal::ONE
            };
            (helper.gross() * sign, Decimal::ZERO)
        } else if helper.class.is_expense() {
            let sign = if helper.debit.asset.is_payee() {
                Decimal::NEGATIVE_ONE
            } else {
                Decimal::ONE
            };
            (Decimal::ZERO, helper.local * sign)
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };
        for id in &transaction.tags {
            let tag = self.dataset.tag(id)?;
            self.analysis
                .tags
                .get_or_create(id, || TransactionTagBucket::new(tag))
                .book(helper.key, &transaction.id, income, expense)?;
        }
        Ok(())
    }

    fn debit_account(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let movement = helper.debit.movement(helper.local, helper.class);
        self.account_mut(helper.debit.asset)?
            .adjust_for_debit(helper.key, &helper.transaction.id, &movement)
    }

    fn credit_account(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let movement = helper.credit.movement(helper.local, helper.class);
        self.account_mut(helper.credit.asset)?
            .adjust_for_credit(helper.key, &helper.transaction.id, &movement)
    }

    // Branches

    fn analyse_standard(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let class = helper.class;
        if class == CategoryClass::Parent || class.is_corporate_action() {
            return Err(invalid_pair(helper));
        }
        let debit = helper.debit.asset;
        let credit = helper.credit.asset;
        match (debit.payee_id(), credit.payee_id()) {
            (Some(_), Some(_)) => Err(invalid_pair(helper)),
            (None, None) => {
                self.debit_account(helper)?;
                self.credit_account(helper)?;
                if class.is_income() {
                    self.book_category(helper, helper.category, CategoryAttr::Income, helper.local)?;
                } else if class.is_expense() {
                    self.book_category(helper, helper.category, CategoryAttr::Expense, helper.local)?;
                }
                Ok(())
            }
            (Some(payee), None) => {
                if class.is_income() {
                    self.credit_account(helper)?;
                    self.book_income(helper, payee, credit, class.tax_basis(), Decimal::ONE)
                } else if class.is_expense() {
                    self.credit_account(helper)?;
                    self.book_expense(helper, payee, credit, Decimal::NEGATIVE_ONE)
                } else {
                    Err(invalid_pair(helper))
                }
            }
            (None, Some(payee)) => {
                if class.is_expense() {
                    self.debit_account(helper)?;
                    self.book_expense(helper, payee, debit, Decimal::ONE)
                } else if class.is_income() {
                    self.debit_account(helper)?;
                    self.book_income(helper, payee, debit, class.tax_basis(), Decimal::NEGATIVE_ONE)
                } else {
                    Err(invalid_pair(helper))
                }
            }
        }
    }

    /// The auto-expense account never holds money: whatever arrives is spent
    /// at its implied payee and category, and spending out of it reverses that.
    fn analyse_auto_expense(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let class = helper.class;
        if class == CategoryClass::Parent || class.is_corporate_action() {
            return Err(invalid_pair(helper));
        }
        let debit = helper.debit.asset;
        let credit = helper.credit.asset;
        let (auto_asset, other, inflow) = match auto_expense(self.dataset, credit)? {
            Some(_) => (credit, debit, true),
            None => (debit, credit, false),
        };
        let implied = auto_expense(self.dataset, auto_asset)?
            .cloned()
            .ok_or_else(|| invalid_pair(helper))?;

        match other.payee_id() {
            None if inflow => self.debit_account(helper)?,
            None => self.credit_account(helper)?,
            Some(payee) => {
                match (inflow, class.is_income(), class.is_expense()) {
                    (true, true, _) => {
                        self.book_income(helper, payee, auto_asset, class.tax_basis(), Decimal::ONE)?
                    }
                    (true, _, true) => {
                        self.book_expense(helper, payee, auto_asset, Decimal::NEGATIVE_ONE)?
                    }
                    (false, _, true) => self.book_expense(helper, payee, auto_asset, Decimal::ONE)?,
                    (false, true, _) => self.book_income(
                        helper,
                        payee,
                        auto_asset,
                        class.tax_basis(),
                        Decimal::NEGATIVE_ONE,
                    )?,
                    _ => return Err(invalid_pair(helper)),
                }
            }
        }

        let implied_amount = if inflow { helper.local } else { -helper.local };
        self.book_payee(helper, &implied.payee, PayeeAttr::Expense, implied_amount)?;
        let dataset = self.dataset;
        let category = dataset.category(&implied.category)?;
        self.book_category(helper, category, CategoryAttr::Expense, implied_amount)?;
        self.book_tax_basis(
            helper,
            category.class.tax_basis(),
            auto_asset,
            TaxAmounts::untaxed(implied_amount),
        )?;

        let spend = match (inflow, other.is_payee()) {
            (true, _) => helper.local,
            (false, false) => -helper.local,
            (false, true) => Decimal::ZERO,
        };
        self.account_mut(auto_asset)?
            .record_spend(helper.key, &helper.transaction.id, spend)
    }

    fn analyse_debit_security(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let Some(holding) = helper.debit.asset.holding_id() else {
            return Err(invalid_pair(helper));
        };
        let holding_asset = helper.debit.asset;
        let credit = helper.credit.asset;
        let class = helper.class;
        let units = helper.debit.units.map(|u| u.abs()).filter(|u| !u.is_zero());

        match (class, credit.payee_id()) {
            (c, None) if c.is_income() && c != CategoryClass::ChargeableGain => {
                self.security_income(helper, holding, holding_asset)?;
                self.credit_account(helper)
            }
            (
                CategoryClass::Transfer
                | CategoryClass::ReturnOfCapital
                | CategoryClass::StockRightsIssue
                | CategoryClass::ChargeableGain,
                None,
            ) => {
                let gain_class = if class == CategoryClass::ChargeableGain {
                    CategoryClass::ChargeableGain
                } else {
                    CategoryClass::CapitalGain
                };
                match units {
                    Some(units) => self.dispose(helper, holding, units, gain_class)?,
                    None => self.distribute(helper, holding, gain_class)?,
                }
                self.credit_account(helper)
            }
            (c, Some(payee)) if c.is_expense() => {
                let units = units.ok_or_else(|| missing_units(helper))?;
                self.dispose(helper, holding, units, CategoryClass::CapitalGain)?;
                self.book_expense(helper, payee, holding_asset, Decimal::ONE)
            }
            _ => Err(invalid_pair(helper)),
        }
    }

    /// Dividend or other income paid by a holding's issuer.
    fn security_income(
        &mut self,
        helper: &TransactionHelper<'_>,
        holding: &HoldingId,
        holding_asset: &AssetRef,
    ) -> Result<()> {
        let issuer = self.issuer(holding)?;
        let security_class = self.dataset.security(&holding.security)?.class;
        let basis = Self::income_basis(helper.class, Some(security_class));
        self.book_income(helper, &issuer, holding_asset, basis, Decimal::ONE)?;
        let bucket = self.holding_mut(holding)?;
        bucket.adjust(SecurityAttr::Dividend, helper.local);
        bucket.register(helper.key, &helper.transaction.id)
    }

    /// Sell `units` out of `holding` for the transaction's amount.
    fn dispose(
        &mut self,
        helper: &TransactionHelper<'_>,
        holding: &HoldingId,
        units: Decimal,
        gain_class: CategoryClass,
    ) -> Result<()> {
        let date = helper.key.date;
        let proceeds = helper.local;
        let bucket = self.holding_mut(holding)?;
        let held = bucket.units();
        if units > held {
            return Err(AnalysisError::UnitsExceedHolding {
                transaction: helper.transaction.id.clone(),
                requested: units.to_string(),
                held: held.to_string(),
            });
        }
        let start = bucket.start_date();
        let cost = bucket.cost_of_units(units);
        let gain = proceeds - cost;
        bucket.add_units(-units, date);
        bucket.adjust(SecurityAttr::ResidualCost, -cost);
        bucket.adjust_invested(-proceeds, -helper.debit.amount);
        bucket.adjust(SecurityAttr::RealisedGains, gain);
        bucket.register(helper.key, &helper.transaction.id)?;
        debug!(
            holding = %holding,
            units = %units,
            cost = %cost,
            gain = %gain,
            "Disposed of units"
        );

        if gain_class == CategoryClass::ChargeableGain {
            self.record_chargeable_gain(holding, date, start, gain);
        }
        self.book_gain(helper, gain_class, &AssetRef::Holding(holding.clone()), gain)
    }

    /// Cash returned from a holding without giving up units.
    fn distribute(
        &mut self,
        helper: &TransactionHelper<'_>,
        holding: &HoldingId,
        gain_class: CategoryClass,
    ) -> Result<()> {
        let date = helper.key.date;
        let amount = helper.local;
        let distribution = &self.config.distribution;
        let value = if amount > distribution.limit {
            let market = self.market;
            self.holding_mut(holding)?
                .market_value(date, market.prices(), market.rates())?
        } else {
            Decimal::ZERO
        };
        let large = self.config.distribution.is_large(amount, value);
        let reporting = self.reporting();

        let bucket = self.holding_mut(holding)?;
        let start = bucket.start_date();
        let cost = allocate_cost(large, amount, value, bucket.residual_cost(), &reporting);
        let gain = amount - cost;
        bucket.adjust(SecurityAttr::ResidualCost, -cost);
        bucket.adjust_invested(-amount, -helper.debit.amount);
        bucket.adjust(SecurityAttr::RealisedGains, gain);
        bucket.register(helper.key, &helper.transaction.id)?;
        debug!(
            holding = %holding,
            amount = %amount,
            value = %value,
            large,
            cost = %cost,
            "Capital distribution"
        );

        if gain_class == CategoryClass::ChargeableGain {
            self.record_chargeable_gain(holding, date, start, gain);
        }
        self.book_gain(helper, gain_class, &AssetRef::Holding(holding.clone()), gain)
    }

    fn record_chargeable_gain(
        &mut self,
        holding: &HoldingId,
        date: NaiveDate,
        start: Option<NaiveDate>,
        gain: Decimal,
    ) {
        let slice = ChargeableGainSlice::new(
            holding.clone(),
            date,
            start,
            gain,
            self.config.chargeable_gain_min_years,
            self.analysis.currency(),
        );
        self.analysis.chargeable_gains.push(slice);
    }

    fn analyse_credit_security(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let Some(holding) = helper.credit.asset.holding_id() else {
            return Err(invalid_pair(helper));
        };
        let holding_asset = helper.credit.asset;
        let class = helper.class;
        match (class, helper.debit.asset.payee_id()) {
            (CategoryClass::Transfer | CategoryClass::StockRightsIssue, None) => {
                let units = helper
                    .credit
                    .units
                    .filter(|u| !u.is_zero())
                    .ok_or_else(|| missing_units(helper))?;
                self.debit_account(helper)?;
                self.purchase(helper, holding, units.abs(), helper.local, helper.credit.amount)
            }
            (c, Some(payee)) if c.is_income() => {
                let security_class = self.dataset.security(&holding.security)?.class;
                let basis = Self::income_basis(class, Some(security_class));
                self.book_income(helper, payee, holding_asset, basis, Decimal::ONE)?;
                let units = helper.credit.units.unwrap_or_default();
                let bucket = self.holding_mut(holding)?;
                bucket.add_units(units, helper.key.date);
                bucket.adjust(SecurityAttr::ResidualCost, helper.local);
                bucket.adjust_invested(helper.local, helper.credit.amount);
                bucket.adjust(SecurityAttr::Dividend, helper.local);
                bucket.register(helper.key, &helper.transaction.id)
            }
            _ => Err(invalid_pair(helper)),
        }
    }

    fn purchase(
        &mut self,
        helper: &TransactionHelper<'_>,
        holding: &HoldingId,
        units: Decimal,
        local: Decimal,
        foreign: Decimal,
    ) -> Result<()> {
        let bucket = self.holding_mut(holding)?;
        bucket.add_units(units, helper.key.date);
        bucket.adjust(SecurityAttr::ResidualCost, local);
        bucket.adjust_invested(local, foreign);
        bucket.register(helper.key, &helper.transaction.id)
    }

    fn analyse_both_security(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let (Some(from), Some(to)) = (
            helper.debit.asset.holding_id(),
            helper.credit.asset.holding_id(),
        ) else {
            return Err(invalid_pair(helper));
        };
        let class = helper.class;

        if from == to {
            return match class {
                CategoryClass::StockSplit | CategoryClass::UnitsAdjust => {
                    let units = helper
                        .transaction
                        .account_delta_units
                        .or(helper.transaction.partner_delta_units)
                        .ok_or_else(|| missing_units(helper))?;
                    let bucket = self.holding_mut(from)?;
                    bucket.add_units(units, helper.key.date);
                    bucket.register(helper.key, &helper.transaction.id)
                }
                c if c.is_dividend() => {
                    self.security_income(helper, from, helper.debit.asset)?;
                    let units = helper.credit.units.unwrap_or_default();
                    self.purchase(helper, to, units, helper.local, helper.credit.amount)
                }
                _ => Err(invalid_pair(helper)),
            };
        }

        match class {
            CategoryClass::StockDeMerger => self.demerge(helper, from, to),
            CategoryClass::StockTakeOver | CategoryClass::SecurityReplace => {
                self.take_over(helper, from, to)
            }
            CategoryClass::Transfer | CategoryClass::PortfolioXfer
                if from.security == to.security =>
            {
                let units = helper
                    .debit
                    .units
                    .or(helper.credit.units)
                    .map(|u| u.abs())
                    .filter(|u| !u.is_zero())
                    .ok_or_else(|| missing_units(helper))?;
                self.move_units(helper, from, to, units)
            }
            c if c.is_dividend() => {
                self.security_income(helper, from, helper.debit.asset)?;
                let units = helper
                    .credit
                    .units
                    .filter(|u| !u.is_zero())
                    .ok_or_else(|| missing_units(helper))?;
                self.purchase(helper, to, units, helper.local, helper.credit.amount)
            }
            _ => Err(invalid_pair(helper)),
        }
    }

    /// Part of `from` is spun off into `to`; `dilution` is the fraction of
    /// the original value that stays behind.
    fn demerge(
        &mut self,
        helper: &TransactionHelper<'_>,
        from: &HoldingId,
        to: &HoldingId,
    ) -> Result<()> {
        let dilution = helper
            .transaction
            .dilution
            .ok_or_else(|| AnalysisError::MissingDilution {
                transaction: helper.transaction.id.clone(),
                class: helper.class,
            })?;
        let units = helper
            .credit
            .units
            .filter(|u| !u.is_zero())
            .ok_or_else(|| missing_units(helper))?;
        let date = helper.key.date;
        let reporting = self.reporting();

        let from_currency = self.holding_mut(from)?.currency().clone();
        let to_currency = self.holding_mut(to)?.currency().clone();
        let (new_foreign, new_value) = self.market_values(&to.security, &to_currency, units, date)?;
        let old_foreign = self.foreign_amount(new_value, &from_currency, date)?;

        let old = self.holding_mut(from)?;
        let cost_out = reporting.round(old.residual_cost() * (Decimal::ONE - dilution));
        let growth = new_value - cost_out;
        old.adjust(SecurityAttr::ResidualCost, -cost_out);
        old.adjust_invested(-cost_out, -old_foreign);
        old.adjust(SecurityAttr::GrowthAdjust, growth);
        old.register(helper.key, &helper.transaction.id)?;

        let new = self.holding_mut(to)?;
        new.add_units(units, date);
        new.adjust(SecurityAttr::ResidualCost, cost_out);
        new.adjust_invested(cost_out, new_foreign);
        new.adjust(SecurityAttr::GrowthAdjust, -growth);
        new.register(helper.key, &helper.transaction.id)?;
        debug!(
            from = %from,
            to = %to,
            cost = %cost_out,
            value = %new_value,
            "De-merger"
        );
        Ok(())
    }

    /// `from` is replaced by units of `to`, possibly with cash returned.
    fn take_over(
        &mut self,
        helper: &TransactionHelper<'_>,
        from: &HoldingId,
        to: &HoldingId,
    ) -> Result<()> {
        let units = helper
            .credit
            .units
            .filter(|u| !u.is_zero())
            .ok_or_else(|| missing_units(helper))?;
        let date = helper.key.date;
        let reporting = self.reporting();
        let cash = helper.returned_cash_local();

        let from_currency = self.holding_mut(from)?.currency().clone();
        let to_currency = self.holding_mut(to)?.currency().clone();
        let (stock_foreign, stock_value) =
            self.market_values(&to.security, &to_currency, units, date)?;
        let old_foreign = self.foreign_amount(stock_value + cash, &from_currency, date)?;

        let large = self
            .config
            .distribution
            .is_large(cash, cash + stock_value);
        let old = self.holding_mut(from)?;
        let residual = old.residual_cost();
        let old_units = old.units();
        let cost_to_cash = allocate_cost(large, cash, stock_value, residual, &reporting);
        let stock_cost = residual - cost_to_cash;
        let gain = cash - cost_to_cash;
        let growth = stock_value - stock_cost;

        old.add_units(-old_units, date);
        old.adjust(SecurityAttr::ResidualCost, -residual);
        old.adjust_invested(-(stock_cost + cash), -old_foreign);
        old.adjust(SecurityAttr::RealisedGains, gain);
        old.adjust(SecurityAttr::GrowthAdjust, growth);
        old.register(helper.key, &helper.transaction.id)?;

        let new = self.holding_mut(to)?;
        new.add_units(units, date);
        new.adjust(SecurityAttr::ResidualCost, stock_cost);
        new.adjust_invested(stock_cost, stock_foreign);
        new.adjust(SecurityAttr::GrowthAdjust, -growth);
        new.register(helper.key, &helper.transaction.id)?;
        debug!(
            from = %from,
            to = %to,
            cash = %cash,
            stock = %stock_value,
            large,
            cost_to_cash = %cost_to_cash,
            "Take-over"
        );

        if let Some(returned) = &helper.returned_cash {
            let movement = returned.movement(helper.class);
            self.account_mut(returned.account)?.adjust_for_credit(
                helper.key,
                &helper.transaction.id,
                &movement,
            )?;
        }
        self.book_gain(
            helper,
            CategoryClass::CapitalGain,
            &AssetRef::Holding(from.clone()),
            gain,
        )
    }

    /// A reporting-currency amount expressed in `currency` on `date`.
    fn foreign_amount(&self, local: Decimal, currency: &Currency, date: NaiveDate) -> Result<Decimal> {
        if local.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let rate = self.rate(currency, date)?;
        from_local(local, rate, currency)
    }

    /// Move units of one security between portfolios at their book cost.
    fn move_units(
        &mut self,
        helper: &TransactionHelper<'_>,
        from: &HoldingId,
        to: &HoldingId,
        units: Decimal,
    ) -> Result<()> {
        let date = helper.key.date;
        let old = self.holding_mut(from)?;
        let held = old.units();
        if units > held {
            return Err(AnalysisError::UnitsExceedHolding {
                transaction: helper.transaction.id.clone(),
                requested: units.to_string(),
                held: held.to_string(),
            });
        }
        let cost = old.cost_of_units(units);
        let start = old.start_date();
        let currency = old.currency().clone();
        let (foreign, value) = self.market_values(&from.security, &currency, units, date)?;
        let growth = value - cost;

        let old = self.holding_mut(from)?;
        old.add_units(-units, date);
        old.adjust(SecurityAttr::ResidualCost, -cost);
        old.adjust_invested(-cost, -foreign);
        old.adjust(SecurityAttr::GrowthAdjust, growth);
        old.register(helper.key, &helper.transaction.id)?;

        let new = self.holding_mut(to)?;
        let opening = new.units().is_zero();
        new.add_units(units, date);
        if let (true, Some(start)) = (opening, start) {
            new.set_start_date(start);
        }
        new.adjust(SecurityAttr::ResidualCost, cost);
        new.adjust_invested(cost, foreign);
        new.adjust(SecurityAttr::GrowthAdjust, -growth);
        new.register(helper.key, &helper.transaction.id)
    }

    fn analyse_portfolio_transfer(&mut self, helper: &TransactionHelper<'_>) -> Result<()> {
        let (AssetRef::Portfolio(from), AssetRef::Portfolio(to)) =
            (helper.debit.asset, helper.credit.asset)
        else {
            return Err(invalid_pair(helper));
        };
        let securities: Vec<(Id, Decimal)> = self
            .portfolio_mut(from)?
            .holdings()
            .filter(|h| !h.units().is_zero())
            .map(|h| (h.holding().security.clone(), h.units()))
            .collect();
        for (security, units) in securities {
            self.move_units(
                helper,
                &HoldingId::new(from.clone(), security.clone()),
                &HoldingId::new(to.clone(), security),
                units,
            )?;
        }
        if !helper.local.is_zero() {
            self.debit_account(helper)?;
            self.credit_account(helper)?;
        }
        Ok(())
    }

    /// Fail on closed assets that still hold something, then flag what is
    /// worth reporting.
    fn post_process_analysis(&mut self) -> Result<()> {
        for account in self.analysis.accounts.buckets_mut() {
            let active = account.is_active();
            if account.is_closed() && active {
                return Err(AnalysisError::ClosedButActive {
                    kind: account.variant().kind_name(),
                    id: account.asset().to_string(),
                });
            }
            account.set_relevant(active);
        }
        for portfolio in self.analysis.portfolios.iter_mut() {
            let active = portfolio.cash().is_active();
            if portfolio.cash().is_closed() && active {
                return Err(AnalysisError::ClosedButActive {
                    kind: "portfolio",
                    id: portfolio.id().to_string(),
                });
            }
            portfolio.cash_mut().set_relevant(active);
            for holding in portfolio.holdings_mut() {
                let active = holding.is_active();
                if holding.is_closed() && active {
                    return Err(AnalysisError::ClosedButActive {
                        kind: "security",
                        id: holding.holding().to_string(),
                    });
                }
                holding.set_relevant(active);
            }
        }
        Ok(())
    }
}
