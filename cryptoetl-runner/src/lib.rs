//! cryptoetl runner: load stage, hand-off channels and stage orchestration.
//!
//! This crate builds on `cryptoetl-core` to provide:
//! - TOML pipeline configuration (extract + database settings)
//! - Write-once/read-once hand-off channels (memory and file)
//! - The transactional load stage and its PostgreSQL store
//! - Helpers that run the two stages in order

pub mod config;
pub mod handoff;
pub mod load;
pub mod pipeline;

pub use config::{DatabaseConfig, DbPassword, PipelineConfig};
pub use handoff::{FileHandoff, HandoffChannel, HandoffError, MemoryHandoff};
pub use load::{load_documents, load_payload, LoadError, LoadReport, PgStore, RawStore};
pub use pipeline::{
    consume_payload, load_into_postgres, read_payload, run_extract, ExtractSummary,
    PipelineError,
};
