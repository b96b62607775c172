//! Typed records stored as documents

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::Document;
use crate::error::{Result, StoreError};

/// A typed value that lives in one collection
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// Collection the record type is stored in
    fn collection_name() -> &'static str;

    fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::InvalidDocument(format!(
                "{} record serialized to non-object: {}",
                Self::collection_name(),
                other
            ))),
        }
    }

    fn from_document(doc: Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}
