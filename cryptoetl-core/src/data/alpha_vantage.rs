//! Alpha Vantage data source.
//!
//! Fetches `DIGITAL_CURRENCY_DAILY` documents with a blocking client. One
//! attempt per symbol, no retry. Alpha Vantage answers most problems with a
//! 200 status and a JSON body carrying `Error Message`, `Information` or
//! `Note`, so the body is classified before it is accepted as a document.

use super::provider::{FetchFailure, FetchResult, MarketDataSource};
use crate::config::{ApiKey, ExtractConfig};
use crate::domain::{Document, Symbol};
use log::debug;
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

const ERROR_KEY: &str = "Error Message";
const INFORMATION_KEY: &str = "Information";
const NOTE_KEY: &str = "Note";
const API_KEY_PARAM: &str = "apikey";

/// Longest body excerpt written to the debug log.
const BODY_EXCERPT_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Alpha Vantage market data source.
pub struct AlphaVantageSource {
    client: reqwest::blocking::Client,
    base_url: Url,
    function: String,
    market: String,
    api_key: ApiKey,
}

impl AlphaVantageSource {
    pub fn new(config: &ExtractConfig) -> Result<Self, SourceError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| SourceError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("cryptoetl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            function: config.function.clone(),
            market: config.market.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Request URL up to, but not including, the credential.
    fn target_without_key(&self, symbol: &Symbol) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("function", &self.function)
            .append_pair("symbol", symbol.as_str())
            .append_pair("market", &self.market);
        url
    }
}

impl MarketDataSource for AlphaVantageSource {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn redacted_target(&self, symbol: &Symbol) -> String {
        self.target_without_key(symbol).to_string()
    }

    fn fetch(&self, symbol: &Symbol) -> FetchResult {
        let mut url = self.target_without_key(symbol);
        url.query_pairs_mut()
            .append_pair(API_KEY_PARAM, self.api_key.expose());

        // reqwest errors embed the request URL; strip it so the key stays out of logs.
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) => {
                debug!("request for {symbol} failed: {}", e.without_url());
                return FetchResult::Failure(FetchFailure::Http);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            debug!("HTTP {status} for {symbol}");
            return FetchResult::Failure(FetchFailure::Http);
        }

        let body = match resp.text() {
            Ok(body) => body,
            Err(e) => return FetchResult::Failure(FetchFailure::Other(e.without_url().to_string())),
        };

        let result = classify_body(symbol, &body);
        if let FetchResult::Failure(FetchFailure::UnexpectedStructure) = result {
            debug!(
                "unexpected API response structure for {symbol}: {}",
                excerpt(&body)
            );
        }
        result
    }
}

/// Classify a 2xx response body.
///
/// Precedence: malformed JSON, error field, information field, note field,
/// missing metadata block, success.
pub fn classify_body(symbol: &Symbol, body: &str) -> FetchResult {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => return FetchResult::Failure(FetchFailure::Other(format!("malformed JSON: {e}"))),
    };

    let Value::Object(map) = value else {
        return FetchResult::Failure(FetchFailure::UnexpectedStructure);
    };

    if let Some(msg) = map.get(ERROR_KEY) {
        return FetchResult::Failure(FetchFailure::UpstreamError(message_text(msg)));
    }
    if let Some(msg) = map.get(INFORMATION_KEY).or_else(|| map.get(NOTE_KEY)) {
        return FetchResult::Failure(FetchFailure::UpstreamInfo(message_text(msg)));
    }

    match Document::from_response(map, symbol) {
        Some(doc) => FetchResult::Success(doc),
        None => FetchResult::Failure(FetchFailure::UnexpectedStructure),
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
