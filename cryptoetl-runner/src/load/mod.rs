//! Load stage and its storage backends

pub mod loader;
#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;
pub mod store;

pub use loader::{load_documents, load_payload, LoadError, LoadReport};
pub use postgres::PgStore;
pub use store::{RawBatch, RawStore, StoreError, CREATE_TABLE_SQL, INSERT_SQL, TABLE_NAME};
