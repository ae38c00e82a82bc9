//! PostgreSQL implementation of the raw store.

use super::store::{RawBatch, RawStore, StoreError, CREATE_TABLE_SQL, INSERT_SQL};
use crate::config::DatabaseConfig;
use async_trait::async_trait;
use log::debug;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

/// Raw store backed by a single-connection pool.
///
/// One connection is all a run needs; the pool exists for its acquire timeout
/// and guaranteed release.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        debug!(
            "connecting to postgres at {}:{}/{}",
            config.host, config.port, config.dbname
        );
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout())
            .connect_with(config.connect_options())
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the pool, waiting for the connection to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RawStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn RawBatch>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBatch { tx: Some(tx) }))
    }
}

struct PgBatch {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgBatch {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::Finished)
    }
}

#[async_trait]
impl RawBatch for PgBatch {
    async fn ensure_table(&mut self) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(CREATE_TABLE_SQL).execute(&mut **tx).await?;
        Ok(())
    }

    async fn insert(&mut self, data: &str, symbol: &str) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(INSERT_SQL)
            .bind(data)
            .bind(symbol)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
