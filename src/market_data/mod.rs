mod lookup;
mod store;
mod tax_year;

pub use lookup::{effective_rate, from_local, to_local, MarketData, PriceLookup, RateLookup};
pub use store::MemoryMarketData;
pub use tax_year::{TaxAnalysis, TaxYear, TaxYearCalculator};
