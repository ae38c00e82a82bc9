use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum symbol length accepted by the `raw_crypto_data.symbol` column.
pub const MAX_SYMBOL_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("symbol is empty")]
    Empty,

    #[error("symbol '{0}' is longer than {max} characters", max = MAX_SYMBOL_LEN)]
    TooLong(String),

    #[error("symbol '{0}' contains characters other than ASCII letters and digits")]
    InvalidCharacters(String),
}

/// Ticker code of one digital currency (e.g. `BTC`).
///
/// Stored upper-case. Construction validates length and charset so that every
/// symbol fits the storage column it ends up in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: &str) -> Result<Self, SymbolError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SymbolError::Empty);
        }
        if trimmed.len() > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong(trimmed.to_string()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SymbolError::InvalidCharacters(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Symbols fetched when the configuration does not list any.
pub fn default_symbols() -> Vec<Symbol> {
    ["BTC", "ETH"]
        .into_iter()
        .map(|s| Symbol(s.to_string()))
        .collect()
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
