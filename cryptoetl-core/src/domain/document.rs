//! Opaque market-data documents.
//!
//! A document is the upstream JSON object passed through verbatim. The only
//! parts this crate looks at are the metadata block, which must exist, and
//! the `symbol` key injected into it after a successful fetch.

use super::symbol::Symbol;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the metadata block in Alpha Vantage time-series responses.
pub const META_DATA_KEY: &str = "Meta Data";

/// Key injected into the metadata block to record the originating symbol.
pub const SYMBOL_KEY: &str = "symbol";

/// One symbol's fetched market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Wrap a parsed response body, stamping `symbol` into its metadata block.
    ///
    /// Returns `None` if the body has no metadata object.
    pub fn from_response(mut body: Map<String, Value>, symbol: &Symbol) -> Option<Self> {
        let meta = body.get_mut(META_DATA_KEY)?.as_object_mut()?;
        meta.insert(
            SYMBOL_KEY.to_string(),
            Value::String(symbol.as_str().to_string()),
        );
        Some(Self(body))
    }

    /// The metadata block, if present.
    pub fn meta_data(&self) -> Option<&Map<String, Value>> {
        self.0.get(META_DATA_KEY)?.as_object()
    }

    /// Symbol recorded in the metadata block.
    pub fn symbol(&self) -> Option<&str> {
        self.meta_data()?.get(SYMBOL_KEY)?.as_str()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Serialize the whole document to JSON text.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}
