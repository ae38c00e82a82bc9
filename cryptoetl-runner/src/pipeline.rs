//! Stage orchestration.
//!
//! The extract stage is blocking and must run outside any async runtime; the
//! load stage is async. Callers run `run_extract` first, then `read_payload`,
//! drive the load functions on a runtime of their choice, and call
//! `consume_payload` only once the load has committed.

use crate::config::DatabaseConfig;
use crate::handoff::{HandoffChannel, HandoffError};
use crate::load::{load_payload, LoadError, LoadReport, PgStore};
use cryptoetl_core::config::ConfigError;
use cryptoetl_core::data::{
    extract_symbols, ExtractError, ExtractProgress, FetchFailure, MarketDataSource,
};
use cryptoetl_core::domain::{HandoffPayload, Symbol};
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("extract stage failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("hand-off failed: {0}")]
    Handoff(#[from] HandoffError),

    #[error("load stage failed: {0}")]
    Load(#[from] LoadError),
}

/// What the extract stage reports once its payload is handed off.
#[derive(Debug)]
pub struct ExtractSummary {
    pub documents: usize,
    pub succeeded: Vec<Symbol>,
    pub failed: Vec<(Symbol, FetchFailure)>,
}

/// Extract every symbol and publish the payload to the channel.
pub fn run_extract(
    source: &dyn MarketDataSource,
    symbols: &[Symbol],
    channel: &mut dyn HandoffChannel,
    progress: &dyn ExtractProgress,
) -> Result<ExtractSummary, PipelineError> {
    info!("Extracting {} symbol(s) from {}", symbols.len(), source.name());
    let report = extract_symbols(source, symbols, progress)?;

    let summary = ExtractSummary {
        documents: report.payload.len(),
        succeeded: report.succeeded,
        failed: report.failed,
    };
    channel.publish(report.payload)?;
    Ok(summary)
}

/// Read the payload for the load stage without consuming it.
///
/// An empty slot is `LoadError::MissingPayload`; a slot holding no documents
/// is `LoadError::EmptyPayload`, whichever channel it came through.
pub fn read_payload(channel: &dyn HandoffChannel) -> Result<HandoffPayload, PipelineError> {
    match channel.read() {
        Ok(Some(payload)) => Ok(payload),
        Ok(None) => Err(LoadError::MissingPayload.into()),
        Err(HandoffError::EmptyPayload(_)) => Err(LoadError::EmptyPayload.into()),
        Err(e) => Err(e.into()),
    }
}

/// Mark the payload as loaded. Call only after the load committed.
pub fn consume_payload(channel: &mut dyn HandoffChannel) -> Result<(), PipelineError> {
    channel.consume()?;
    Ok(())
}

/// Connect, load, and close, whatever the outcome of the load.
pub async fn load_into_postgres(
    config: &DatabaseConfig,
    payload: &HandoffPayload,
) -> Result<LoadReport, PipelineError> {
    let store = PgStore::connect(config).await.map_err(LoadError::from)?;
    let result = load_payload(&store, payload).await;
    store.close().await;
    info!("DB connection closed");
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::{FileHandoff, MemoryHandoff};
    use crate::load::memory::MemoryStore;
    use cryptoetl_core::data::{FetchResult, SilentProgress};
    use cryptoetl_core::domain::Document;
    use serde_json::json;

    /// Source answering BTC and ETH with documents and everything else with an upstream error.
    struct TwoCoinSource;

    impl MarketDataSource for TwoCoinSource {
        fn name(&self) -> &str {
            "two-coin"
        }

        fn redacted_target(&self, symbol: &Symbol) -> String {
            format!("test://{symbol}")
        }

        fn fetch(&self, symbol: &Symbol) -> FetchResult {
            match symbol.as_str() {
                "BTC" | "ETH" => {
                    let body = json!({
                        "Meta Data": {"2. Digital Currency Code": symbol.as_str()},
                        "Time Series (Digital Currency Daily)": {}
                    });
                    let doc = Document::from_response(body.as_object().cloned().unwrap(), symbol)
                        .unwrap();
                    FetchResult::Success(doc)
                }
                _ => FetchResult::Failure(FetchFailure::UpstreamError("invalid symbol".into())),
            }
        }
    }

    fn symbols(list: &[&str]) -> Vec<Symbol> {
        list.iter().map(|s| Symbol::new(s).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_full_run_commits_both_symbols() {
        let mut channel = MemoryHandoff::new();
        let store = MemoryStore::new();

        let summary = run_extract(
            &TwoCoinSource,
            &symbols(&["BTC", "ETH"]),
            &mut channel,
            &SilentProgress,
        )
        .unwrap();
        assert_eq!(summary.documents, 2);
        assert!(summary.failed.is_empty());

        let payload = read_payload(&channel).unwrap();
        let report = load_payload(&store, &payload).await.unwrap();
        consume_payload(&mut channel).unwrap();

        assert_eq!(report.rows, 2);
        assert_eq!(store.commits(), 1);
        assert_eq!(store.rows().len(), 2);
    }

    #[test]
    fn test_total_extract_failure_publishes_nothing() {
        let mut channel = MemoryHandoff::new();

        let err = run_extract(
            &TwoCoinSource,
            &symbols(&["DOGE", "XRP"]),
            &mut channel,
            &SilentProgress,
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::Extract(_)));
        assert!(matches!(
            read_payload(&channel),
            Err(PipelineError::Load(LoadError::MissingPayload))
        ));
    }

    #[test]
    fn test_payload_cannot_be_loaded_after_consume() {
        let mut channel = MemoryHandoff::new();
        run_extract(
            &TwoCoinSource,
            &symbols(&["BTC", "DOGE"]),
            &mut channel,
            &SilentProgress,
        )
        .unwrap();

        read_payload(&channel).unwrap();
        consume_payload(&mut channel).unwrap();
        assert!(matches!(
            read_payload(&channel),
            Err(PipelineError::Handoff(HandoffError::AlreadyTaken(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_load_can_be_retried_from_file_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut extract_slot = FileHandoff::new(dir.path(), "run1").unwrap();
        run_extract(
            &TwoCoinSource,
            &symbols(&["BTC", "ETH"]),
            &mut extract_slot,
            &SilentProgress,
        )
        .unwrap();

        // First attempt: the load fails, so the slot is left alone.
        let first_attempt = FileHandoff::new(dir.path(), "run1").unwrap();
        let payload = read_payload(&first_attempt).unwrap();
        let failing = MemoryStore::new().failing_on_insert(2);
        assert!(load_payload(&failing, &payload).await.is_err());
        assert!(failing.rows().is_empty());

        // Retry in a fresh process: the payload is still there.
        let mut retry = FileHandoff::new(dir.path(), "run1").unwrap();
        let payload = read_payload(&retry).unwrap();
        let store = MemoryStore::new();
        let report = load_payload(&store, &payload).await.unwrap();
        consume_payload(&mut retry).unwrap();

        assert_eq!(report.symbols, vec!["BTC", "ETH"]);
        assert!(matches!(
            read_payload(&retry),
            Err(PipelineError::Handoff(HandoffError::AlreadyTaken(_)))
        ));
    }

    #[test]
    fn test_empty_file_slot_is_an_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileHandoff::new(dir.path(), "empty").unwrap();
        std::fs::write(slot.path(), "[]").unwrap();

        assert!(matches!(
            read_payload(&slot),
            Err(PipelineError::Load(LoadError::EmptyPayload))
        ));
    }
}
