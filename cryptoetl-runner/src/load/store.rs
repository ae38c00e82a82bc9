//! Storage traits for the load stage.
//!
//! A `RawStore` hands out one `RawBatch` per run. The batch wraps a single
//! transaction on a connection it owns; dropping it without `commit` discards
//! the work and releases the connection.

use async_trait::async_trait;
use thiserror::Error;

pub const TABLE_NAME: &str = "raw_crypto_data";

pub const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS raw_crypto_data (
    id SERIAL PRIMARY KEY,
    data JSONB NOT NULL,
    symbol VARCHAR(10) NOT NULL,
    ingested_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// `$1` is the document as JSON text, `$2` its symbol.
pub const INSERT_SQL: &str = "INSERT INTO raw_crypto_data (data, symbol) VALUES ($1::jsonb, $2)";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("transaction already finished")]
    Finished,
}

/// Something that can open a write transaction for raw documents.
#[async_trait]
pub trait RawStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn RawBatch>, StoreError>;
}

/// One open transaction against the raw-data table.
#[async_trait]
pub trait RawBatch: Send {
    /// Create the destination table if it does not exist. Safe to repeat.
    async fn ensure_table(&mut self) -> Result<(), StoreError>;

    /// Insert one row with bound parameters.
    async fn insert(&mut self, data: &str, symbol: &str) -> Result<(), StoreError>;

    /// Commit the transaction. The batch is finished afterwards, even on error.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard the transaction. A no-op if it already finished.
    async fn rollback(&mut self) -> Result<(), StoreError>;
}
