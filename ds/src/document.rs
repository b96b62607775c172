//! Documents, identities and cursors

use serde_json::{Map, Value};
use uuid::Uuid;

/// A stored document: a JSON object
pub type Document = Map<String, Value>;

/// Field holding a document's identity
pub const ID_FIELD: &str = "id";

/// Identity of a document, if it carries a non-empty one
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str).filter(|id| !id.is_empty())
}

/// Return the document's identity, assigning a fresh UUIDv7 when it has none
pub fn ensure_id(doc: &mut Document) -> String {
    if let Some(id) = document_id(doc) {
        return id.to_string();
    }
    let id = Uuid::now_v7().to_string();
    doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    id
}

/// Iterator over the documents returned by a `find`
#[derive(Debug)]
pub struct Cursor {
    docs: std::vec::IntoIter<Document>,
}

impl Cursor {
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs: docs.into_iter() }
    }

    /// First matching document, consuming the cursor
    pub fn first(mut self) -> Option<Document> {
        self.docs.next()
    }
}

impl Iterator for Cursor {
    type Item = Document;

    fn next(&mut self) -> Option<Self::Item> {
        self.docs.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.docs.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}
