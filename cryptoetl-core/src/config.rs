//! Extraction settings.
//!
//! Everything the extractor needs is passed in through `ExtractConfig`; this
//! crate never reads the process environment. The API key is kept out of the
//! serialized form and attached by the caller with `with_api_key`.

use crate::domain::{default_symbols, Symbol, SymbolError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_FUNCTION: &str = "DIGITAL_CURRENCY_DAILY";
pub const DEFAULT_MARKET: &str = "USD";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid symbol: {0}")]
    Symbol(#[from] SymbolError),

    #[error("symbol list is empty")]
    NoSymbols,

    #[error("symbol '{0}' is listed more than once")]
    DuplicateSymbol(Symbol),

    #[error("API key is missing")]
    MissingApiKey,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Blank { field: &'static str },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Market-data API credential. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Settings for the extract stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Query endpoint of the market-data API.
    pub base_url: String,

    /// API function name, e.g. `DIGITAL_CURRENCY_DAILY`.
    pub function: String,

    /// Base currency the prices are quoted in.
    pub market: String,

    /// Symbols fetched each run, in request order.
    pub symbols: Vec<Symbol>,

    /// Per-request HTTP timeout.
    pub timeout_secs: u64,

    #[serde(skip)]
    pub api_key: ApiKey,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            function: DEFAULT_FUNCTION.to_string(),
            market: DEFAULT_MARKET.to_string(),
            symbols: default_symbols(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: ApiKey::default(),
        }
    }
}

impl ExtractConfig {
    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check everything except the API key.
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if !seen.insert(symbol) {
                return Err(ConfigError::DuplicateSymbol(symbol.clone()));
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "extract.timeout_secs",
            });
        }
        for (field, value) in [
            ("extract.base_url", &self.base_url),
            ("extract.function", &self.function),
            ("extract.market", &self.market),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Blank { field });
            }
        }
        Ok(())
    }

    /// Full validation, required before issuing requests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_settings()?;
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }
}
