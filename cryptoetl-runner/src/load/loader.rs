//! Load stage: persists a hand-off payload in one transaction.

use super::store::{RawBatch, RawStore, StoreError};
use cryptoetl_core::domain::{Document, HandoffPayload};
use log::{error, info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no hand-off payload received; the extract stage may have failed")]
    MissingPayload,

    #[error("hand-off payload is empty; nothing to load")]
    EmptyPayload,

    #[error("document {index} has no symbol in its metadata block")]
    MissingSymbol { index: usize },

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Rows written by a committed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    /// Symbols in insert order.
    pub symbols: Vec<String>,
}

/// Persist a hand-off payload.
pub async fn load_payload(
    store: &dyn RawStore,
    payload: &HandoffPayload,
) -> Result<LoadReport, LoadError> {
    load_documents(store, payload.documents()).await
}

/// Insert every document as one row, all or nothing.
///
/// An empty slice fails before any connection or DDL is touched. Any failure
/// before commit is followed by a rollback; the original error is returned
/// even if the rollback fails too. A failed commit has already consumed the
/// transaction, so there is nothing left to roll back.
pub async fn load_documents(
    store: &dyn RawStore,
    documents: &[Document],
) -> Result<LoadReport, LoadError> {
    if documents.is_empty() {
        return Err(LoadError::EmptyPayload);
    }

    let mut batch = store.begin().await?;

    let symbols = match write_batch(&mut *batch, documents).await {
        Ok(symbols) => symbols,
        Err(e) => {
            error!("An error occurred during database operation: {e}");
            rollback_quietly(&mut *batch).await;
            return Err(e);
        }
    };

    if let Err(e) = batch.commit().await {
        error!("Commit failed, transaction outcome unknown: {e}");
        return Err(e.into());
    }

    info!("Data successfully loaded: {} row(s)", symbols.len());
    Ok(LoadReport {
        rows: symbols.len(),
        symbols,
    })
}

async fn write_batch<B: RawBatch + ?Sized>(
    batch: &mut B,
    documents: &[Document],
) -> Result<Vec<String>, LoadError> {
    batch.ensure_table().await?;
    info!("Table checked/created successfully");

    let mut symbols = Vec::with_capacity(documents.len());
    for (index, doc) in documents.iter().enumerate() {
        let symbol = doc.symbol().ok_or(LoadError::MissingSymbol { index })?;
        let data = doc.to_json_string()?;
        info!("Inserting data for {symbol}");
        batch.insert(&data, symbol).await?;
        symbols.push(symbol.to_string());
    }
    Ok(symbols)
}

async fn rollback_quietly<B: RawBatch + ?Sized>(batch: &mut B) {
    match batch.rollback().await {
        Ok(()) => warn!("Transaction rolled back; no rows were written"),
        Err(e) => error!("Rollback failed: {e}"),
    }
}
