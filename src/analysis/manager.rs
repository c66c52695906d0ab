use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::period::process_period;
use super::{Analysis, TransactionAnalyser};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::market_data::MarketData;
use crate::models::{Dataset, DateRange};

/// Owns a dataset and the raw analysis built from it, and hands out
/// processed views.
///
/// Views are fresh object graphs; the raw analysis is never touched by them.
pub struct AnalysisManager {
    dataset: Dataset,
    market: Arc<dyn MarketData>,
    config: AnalysisConfig,
    raw: Analysis,
}

impl AnalysisManager {
    /// Run the analysis pass over `dataset`.
    pub fn new(dataset: Dataset, market: Arc<dyn MarketData>, config: AnalysisConfig) -> Result<Self> {
        let raw = TransactionAnalyser::run(&dataset, market.as_ref(), &config)?;
        Ok(Self {
            dataset,
            market,
            config,
            raw,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The pass result before any period processing.
    pub fn raw_analysis(&self) -> &Analysis {
        &self.raw
    }

    /// Everything from the dataset start to its last transaction.
    pub fn full_analysis(&self) -> Result<Analysis> {
        self.process(self.raw.clone())
    }

    /// State after every transaction dated on or before `date`.
    pub fn analysis_as_of(&self, date: NaiveDate) -> Result<Analysis> {
        self.process(self.raw.derive_as_of(date))
    }

    /// Activity inside `range`, measured from the state just before it.
    pub fn analysis_for_range(&self, range: DateRange) -> Result<Analysis> {
        self.process(self.raw.derive_for_range(range))
    }

    /// Swap in an edited dataset whose transactions before `date` are unchanged.
    pub fn reanalyse_from(&mut self, dataset: Dataset, date: NaiveDate) -> Result<()> {
        let raw = if self.dataset.analysis_range().is_some_and(|r| date > r.start) {
            TransactionAnalyser::reanalyse_from(
                &self.raw,
                &dataset,
                self.market.as_ref(),
                &self.config,
                date,
            )?
        } else {
            info!(from = %date, "Edit precedes the analysed range; running a full pass");
            TransactionAnalyser::run(&dataset, self.market.as_ref(), &self.config)?
        };
        self.raw = raw;
        self.dataset = dataset;
        Ok(())
    }

    fn process(&self, mut view: Analysis) -> Result<Analysis> {
        process_period(&mut view, &self.dataset, self.market.as_ref(), &self.config)?;
        Ok(view)
    }
}
