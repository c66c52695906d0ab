use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Currency;

/// Default reporting currency.
fn default_currency() -> Currency {
    Currency::new("GBP")
}

fn default_distribution_limit() -> Decimal {
    Decimal::from(3000)
}

fn default_distribution_rate() -> Decimal {
    Decimal::new(5, 2)
}

/// Threshold that splits capital distributions into large and small.
///
/// A distribution of `amount` from a holding worth `value` is large iff
/// `amount > limit` and `amount > value * rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Absolute amount in the reporting currency.
    #[serde(default = "default_distribution_limit")]
    pub limit: Decimal,

    /// Fraction of the holding's value.
    #[serde(default = "default_distribution_rate")]
    pub rate: Decimal,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            limit: default_distribution_limit(),
            rate: default_distribution_rate(),
        }
    }
}

impl DistributionConfig {
    pub fn is_large(&self, amount: Decimal, holding_value: Decimal) -> bool {
        amount > self.limit && amount > holding_value * self.rate
    }
}

/// Analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Reporting currency used when the dataset does not name one.
    #[serde(default = "default_currency")]
    pub default_currency: Currency,

    /// Large/small capital distribution threshold.
    #[serde(default)]
    pub distribution: DistributionConfig,

    /// Drop buckets that are both idle and inactive from derived views.
    pub prune_idle: bool,

    /// Smallest number of years a chargeable gain is sliced over.
    pub chargeable_gain_min_years: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            distribution: DistributionConfig::default(),
            prune_idle: true,
            chargeable_gain_min_years: 1,
        }
    }
}

impl AnalysisConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn with_default_currency(mut self, currency: impl Into<Currency>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_distribution(mut self, limit: Decimal, rate: Decimal) -> Self {
        self.distribution = DistributionConfig { limit, rate };
        self
    }

    pub fn with_prune_idle(mut self, prune: bool) -> Self {
        self.prune_idle = prune;
        self
    }

    /// Reporting currency for a dataset: its own default, else ours.
    pub fn reporting_currency(&self, dataset_default: Option<&Currency>) -> Currency {
        dataset_default
            .cloned()
            .unwrap_or_else(|| self.default_currency.clone())
    }
}
