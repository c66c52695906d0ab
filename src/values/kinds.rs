//! Attribute sets per bucket kind.
//!
//! Each bucket allocates a subset of its kind's attributes on creation; those
//! slots are guaranteed present (as zero) for the bucket's lifetime.

use super::attributes;

attributes! {
    /// Deposit, cash, loan and portfolio-cash accounts.
    ///
    /// Always present: `Valuation`, `ValueDelta`. Foreign accounts add
    /// `ForeignValue`, `LocalValue`, `ExchangeRate` and `CurrencyFluct`; cash and
    /// loans add `Spend`; peer-to-peer deposits add the bad-debt counters.
    /// `Maturity` is set for deposits with a maturity date.
    pub enum AccountAttr {
        /// Balance in the reporting currency.
        Valuation => (Money, Balance, "valuation"),
        /// Balance in the account's own currency.
        ForeignValue => (Money, Balance, "foreign_value"),
        /// Book value: flows converted at their transaction-date rates.
        LocalValue => (Money, Balance, "local_value"),
        ExchangeRate => (Ratio, Point, "exchange_rate"),
        CurrencyFluct => (Money, Point, "currency_fluct"),
        ValueDelta => (Money, Point, "value_delta"),
        Spend => (Money, Flow, "spend"),
        BadDebtCapital => (Money, Flow, "bad_debt_capital"),
        BadDebtInterest => (Money, Flow, "bad_debt_interest"),
        Maturity => (Date, Point, "maturity"),
    }
    activity = [Valuation, ForeignValue];
}

attributes! {
    /// One security held in one portfolio. Money is in the reporting currency
    /// unless prefixed `Foreign`.
    ///
    /// Always present: every attribute except `StartDate`, and the foreign
    /// ones only for foreign holdings.
    pub enum SecurityAttr {
        Units => (Units, Balance, "units"),
        /// Cost basis of the units still held.
        ResidualCost => (Money, Balance, "residual_cost"),
        /// Date the holding last went from zero units to some.
        StartDate => (Date, Point, "start_date"),
        /// Net cash put into the holding.
        Invested => (Money, Flow, "invested"),
        ForeignInvested => (Money, Flow, "foreign_invested"),
        /// Income the holding produced, paid out or reinvested.
        Dividend => (Money, Flow, "dividend"),
        RealisedGains => (Money, Flow, "realised_gains"),
        /// Value moved in or out by corporate actions at a figure other than cost.
        GrowthAdjust => (Money, Flow, "growth_adjust"),
        Price => (Price, Point, "price"),
        Valuation => (Money, Point, "valuation"),
        ForeignValuation => (Money, Point, "foreign_valuation"),
        ExchangeRate => (Ratio, Point, "exchange_rate"),
        ValueDelta => (Money, Point, "value_delta"),
        ForeignValueDelta => (Money, Point, "foreign_value_delta"),
        UnrealisedGains => (Money, Point, "unrealised_gains"),
        Profit => (Money, Point, "profit"),
        MarketGrowth => (Money, Point, "market_growth"),
        ForeignMarketGrowth => (Money, Point, "foreign_market_growth"),
        LocalMarketGrowth => (Money, Point, "local_market_growth"),
        CurrencyFluct => (Money, Point, "currency_fluct"),
    }
    activity = [Units];
}

attributes! {
    /// Portfolio aggregates, recomputed per view from the cash account and holdings.
    pub enum PortfolioAttr {
        Valuation => (Money, Point, "valuation"),
        CashValue => (Money, Point, "cash_value"),
        SecuritiesValue => (Money, Point, "securities_value"),
        ResidualCost => (Money, Point, "residual_cost"),
        Invested => (Money, Point, "invested"),
        Dividend => (Money, Point, "dividend"),
        RealisedGains => (Money, Point, "realised_gains"),
        UnrealisedGains => (Money, Point, "unrealised_gains"),
        ValueDelta => (Money, Point, "value_delta"),
        Profit => (Money, Point, "profit"),
        MarketGrowth => (Money, Point, "market_growth"),
        CurrencyFluct => (Money, Point, "currency_fluct"),
    }
    activity = [Valuation];
}

attributes! {
    pub enum PayeeAttr {
        Income => (Money, Flow, "income"),
        Expense => (Money, Flow, "expense"),
        Profit => (Money, Point, "profit"),
    }
    activity = [Income, Expense];
}

attributes! {
    pub enum CategoryAttr {
        Income => (Money, Flow, "income"),
        Expense => (Money, Flow, "expense"),
        Profit => (Money, Point, "profit"),
    }
    activity = [Income, Expense];
}

attributes! {
    pub enum TaxBasisAttr {
        Gross => (Money, Flow, "gross"),
        Nett => (Money, Flow, "nett"),
        TaxCredit => (Money, Flow, "tax_credit"),
    }
    activity = [Gross, Nett, TaxCredit];
}

attributes! {
    pub enum TagAttr {
        Count => (Units, Flow, "count"),
        Income => (Money, Flow, "income"),
        Expense => (Money, Flow, "expense"),
    }
    activity = [Count, Income, Expense];
}
