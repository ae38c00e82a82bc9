//! Extract stage: fetches every configured symbol and assembles the hand-off payload.

use super::provider::{ExtractProgress, FetchFailure, FetchResult, MarketDataSource};
use crate::domain::{Document, HandoffPayload, Symbol};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("all {} API requests failed; nothing to hand off", .failed.len())]
    AllRequestsFailed { failed: Vec<(Symbol, FetchFailure)> },
}

/// Result of an extraction run with at least one successful symbol.
#[derive(Debug)]
pub struct ExtractReport {
    /// Successful documents in symbol order.
    pub payload: HandoffPayload,
    pub succeeded: Vec<Symbol>,
    pub failed: Vec<(Symbol, FetchFailure)>,
}

impl ExtractReport {
    pub fn failed_symbols(&self) -> Vec<&Symbol> {
        self.failed.iter().map(|(s, _)| s).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch each symbol once, in order, and collect the successes.
///
/// Per-symbol failures are recorded and never stop the loop. The run itself
/// fails only when no symbol produced a document.
pub fn extract_symbols(
    source: &dyn MarketDataSource,
    symbols: &[Symbol],
    progress: &dyn ExtractProgress,
) -> Result<ExtractReport, ExtractError> {
    let total = symbols.len();
    let mut documents: Vec<Document> = Vec::with_capacity(total);
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, &source.redacted_target(symbol), i, total);

        let result = source.fetch(symbol);
        progress.on_complete(symbol, i, total, &result);

        match result {
            FetchResult::Success(doc) => {
                documents.push(doc);
                succeeded.push(symbol.clone());
            }
            FetchResult::Failure(reason) => failed.push((symbol.clone(), reason)),
        }
    }

    progress.on_batch_complete(&succeeded, &failed);

    match HandoffPayload::new(documents) {
        Ok(payload) => Ok(ExtractReport {
            payload,
            succeeded,
            failed,
        }),
        Err(_) => Err(ExtractError::AllRequestsFailed { failed }),
    }
}
