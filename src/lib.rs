pub mod analysis;
pub mod buckets;
pub mod config;
pub mod error;
pub mod history;
pub mod market_data;
pub mod models;
pub mod values;

pub use analysis::{Analysis, AnalysisManager, TransactionAnalyser};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
