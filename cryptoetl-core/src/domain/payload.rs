use super::document::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hand-off payload must contain at least one document")]
pub struct EmptyPayload;

/// Ordered documents from every successful fetch of one extraction run.
///
/// Never empty: both `new` and deserialization refuse an empty sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Document>", into = "Vec<Document>")]
pub struct HandoffPayload(Vec<Document>);

impl HandoffPayload {
    pub fn new(documents: Vec<Document>) -> Result<Self, EmptyPayload> {
        if documents.is_empty() {
            return Err(EmptyPayload);
        }
        Ok(Self(documents))
    }

    pub fn documents(&self) -> &[Document] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed payload.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Symbols of the contained documents, in payload order.
    pub fn symbols(&self) -> Vec<&str> {
        self.0.iter().filter_map(Document::symbol).collect()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.0
    }
}

impl TryFrom<Vec<Document>> for HandoffPayload {
    type Error = EmptyPayload;

    fn try_from(documents: Vec<Document>) -> Result<Self, Self::Error> {
        Self::new(documents)
    }
}

impl From<HandoffPayload> for Vec<Document> {
    fn from(payload: HandoffPayload) -> Self {
        payload.0
    }
}
