//! Market-data source trait and per-symbol fetch outcomes.
//!
//! The MarketDataSource trait abstracts over the upstream API so the extractor
//! can be driven by a scripted source in tests.

use crate::domain::{Document, Symbol};
use log::{error, info, warn};
use thiserror::Error;

/// Why a single symbol could not be fetched.
///
/// None of these abort a run; they are collected into the failure report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// Request could not be sent, or the status was not 2xx.
    #[error("http error")]
    Http,

    /// Upstream returned an explicit error message.
    #[error("{0}")]
    UpstreamError(String),

    /// Upstream returned an informational or rate-limit notice instead of data.
    #[error("{0}")]
    UpstreamInfo(String),

    /// Body parsed but carries no metadata block.
    #[error("unexpected response structure")]
    UnexpectedStructure,

    /// Anything else, e.g. an unreadable or malformed body.
    #[error("{0}")]
    Other(String),
}

/// Outcome of one fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Success(Document),
    Failure(FetchFailure),
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }
}

/// A source of daily digital-currency documents.
pub trait MarketDataSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Request target for a symbol with the credential cut off, safe to log.
    fn redacted_target(&self, symbol: &Symbol) -> String;

    /// Fetch one symbol. A single attempt; never panics or aborts on bad input.
    fn fetch(&self, symbol: &Symbol) -> FetchResult;
}

/// Progress callbacks for an extraction run.
pub trait ExtractProgress {
    /// Called before a symbol is requested.
    fn on_start(&self, symbol: &Symbol, target: &str, index: usize, total: usize);

    /// Called once the symbol's response has been classified.
    fn on_complete(&self, symbol: &Symbol, index: usize, total: usize, result: &FetchResult);

    /// Called when every symbol has been attempted.
    fn on_batch_complete(&self, succeeded: &[Symbol], failed: &[(Symbol, FetchFailure)]);
}

/// Progress reporter that writes through the `log` facade.
pub struct LogProgress;

impl ExtractProgress for LogProgress {
    fn on_start(&self, symbol: &Symbol, target: &str, index: usize, total: usize) {
        info!(
            "[{}/{}] Fetching data for {symbol} from {target}...",
            index + 1,
            total
        );
    }

    fn on_complete(&self, symbol: &Symbol, _index: usize, _total: usize, result: &FetchResult) {
        match result {
            FetchResult::Success(_) => info!("Successfully fetched data for {symbol}"),
            FetchResult::Failure(FetchFailure::UpstreamError(msg)) => {
                warn!("Error from API for {symbol}: {msg}")
            }
            FetchResult::Failure(FetchFailure::UpstreamInfo(msg)) => {
                warn!("Info from API for {symbol}: {msg}")
            }
            FetchResult::Failure(reason) => warn!("Fetch failed for {symbol}: {reason}"),
        }
    }

    fn on_batch_complete(&self, succeeded: &[Symbol], failed: &[(Symbol, FetchFailure)]) {
        let ok: Vec<&str> = succeeded.iter().map(Symbol::as_str).collect();
        let bad: Vec<&str> = failed.iter().map(|(s, _)| s.as_str()).collect();
        info!("Successfully processed symbols: {ok:?}");
        if bad.is_empty() {
            info!("Failed symbols: []");
        } else {
            error!("Failed symbols: {bad:?}");
        }
    }
}

/// Progress reporter that discards everything.
pub struct SilentProgress;

impl ExtractProgress for SilentProgress {
    fn on_start(&self, _symbol: &Symbol, _target: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, _symbol: &Symbol, _index: usize, _total: usize, _result: &FetchResult) {}

    fn on_batch_complete(&self, _succeeded: &[Symbol], _failed: &[(Symbol, FetchFailure)]) {}
}
