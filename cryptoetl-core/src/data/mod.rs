//! Market-data extraction

pub mod alpha_vantage;
pub mod extract;
pub mod provider;

pub use alpha_vantage::{classify_body, AlphaVantageSource, SourceError};
pub use extract::{extract_symbols, ExtractError, ExtractReport};
pub use provider::{
    ExtractProgress, FetchFailure, FetchResult, LogProgress, MarketDataSource, SilentProgress,
};
