//! cryptoetl core: domain types, configuration, and the extract stage.
//!
//! This crate contains:
//! - Symbols, opaque market-data documents, and the hand-off payload
//! - Extraction settings (no environment access)
//! - The Alpha Vantage source and response classification
//! - The per-symbol extraction loop with failure reporting

pub mod config;
pub mod data;
pub mod domain;

pub use config::{ApiKey, ConfigError, ExtractConfig};
pub use data::{extract_symbols, ExtractError, ExtractReport, FetchFailure, FetchResult};
pub use domain::{Document, HandoffPayload, Symbol};
