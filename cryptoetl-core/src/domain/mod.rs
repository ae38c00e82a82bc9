//! Domain types shared by the extract and load stages.

pub mod document;
pub mod payload;
pub mod symbol;

pub use document::{Document, META_DATA_KEY, SYMBOL_KEY};
pub use payload::{EmptyPayload, HandoffPayload};
pub use symbol::{default_symbols, Symbol, SymbolError, MAX_SYMBOL_LEN};
