//! The analysis pass and the views cut from it.

mod analyser;
mod analysis;
mod helper;
mod manager;
mod period;

pub use analyser::{allocate_cost, classify, Branch, TransactionAnalyser};
pub use analysis::Analysis;
pub use helper::{ResolvedCash, Side, TransactionHelper};
pub use manager::AnalysisManager;
