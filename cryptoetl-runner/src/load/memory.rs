//! In-memory raw store for tests.
//!
//! Mirrors the transactional behaviour of the Postgres store: inserts are
//! staged per batch and become visible only on commit. Failures can be
//! injected on the n-th insert, on commit, or on rollback.

use super::store::{RawBatch, RawStore, StoreError};
use async_trait::async_trait;
use cryptoetl_core::domain::MAX_SYMBOL_LEN;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub symbol: String,
    pub data: String,
    /// Commit sequence number; rows of one batch share it like `ingested_at`.
    pub batch: usize,
}

#[derive(Default)]
struct State {
    rows: Vec<StoredRow>,
    next_id: i64,
    commits: usize,
    open_batches: usize,
    ops: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_on_insert: Option<usize>,
    fail_commit: bool,
    fail_rollback: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th insert (1-based) of every batch.
    pub fn failing_on_insert(mut self, n: usize) -> Self {
        self.fail_on_insert = Some(n);
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn ops(&self) -> Vec<String> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn open_batches(&self) -> usize {
        self.state.lock().unwrap().open_batches
    }
}

fn injected(msg: &str) -> StoreError {
    StoreError::Database(sqlx::Error::Protocol(msg.to_string()))
}

#[async_trait]
impl RawStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn RawBatch>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.open_batches += 1;
        state.ops.push("begin".into());
        Ok(Box::new(MemoryBatch {
            store: self.clone(),
            pending: Vec::new(),
            inserts: 0,
            finished: false,
        }))
    }
}

struct MemoryBatch {
    store: MemoryStore,
    pending: Vec<(String, String)>,
    inserts: usize,
    finished: bool,
}

impl MemoryBatch {
    fn log(&self, op: String) {
        self.store.state.lock().unwrap().ops.push(op);
    }

    fn fail_on_insert_now(&self) -> bool {
        self.store.fail_on_insert == Some(self.inserts)
    }
}

#[async_trait]
impl RawBatch for MemoryBatch {
    async fn ensure_table(&mut self) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::Finished);
        }
        self.log("ensure_table".into());
        Ok(())
    }

    async fn insert(&mut self, data: &str, symbol: &str) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::Finished);
        }
        self.inserts += 1;
        self.log(format!("insert {symbol}"));
        if self.fail_on_insert_now() {
            return Err(injected("injected insert failure"));
        }
        if symbol.len() > MAX_SYMBOL_LEN {
            return Err(injected("value too long for type character varying(10)"));
        }
        self.pending.push((data.to_string(), symbol.to_string()));
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::Finished);
        }
        self.log("commit".into());
        // Like a consumed sqlx transaction, a batch is finished even when commit fails.
        self.finished = true;
        if self.store.fail_commit {
            self.pending.clear();
            return Err(injected("injected commit failure"));
        }
        let mut state = self.store.state.lock().unwrap();
        state.commits += 1;
        let batch = state.commits;
        for (data, symbol) in self.pending.drain(..) {
            state.next_id += 1;
            let id = state.next_id;
            state.rows.push(StoredRow {
                id,
                symbol,
                data,
                batch,
            });
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if self.finished {
            return Ok(());
        }
        self.log("rollback".into());
        self.finished = true;
        self.pending.clear();
        if self.store.fail_rollback {
            return Err(injected("injected rollback failure"));
        }
        Ok(())
    }
}

impl Drop for MemoryBatch {
    fn drop(&mut self) {
        if let Ok(mut state) = self.store.state.lock() {
            state.open_batches -= 1;
        }
    }
}
