//! The coordination store contract

use crate::document::{Cursor, Document};
use crate::error::Result;
use crate::filter::Filter;
use crate::update::Update;

/// A shared, multi-reader/multi-writer document store
///
/// Collections are logical namespaces. `find` iterates in insertion order.
/// `find_one_and_update` is the only compare-and-swap primitive: the read
/// and the update happen as one indivisible operation, so two callers
/// racing on the same matching document never both observe it.
pub trait CoordinationStore: Send + Sync {
    /// Append one document, assigning an identity if it has none
    fn insert(&self, collection: &str, doc: Document) -> Result<String>;

    /// Append many documents in order
    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<String>>;

    /// All documents matching every filter; an empty predicate matches all
    fn find(&self, collection: &str, filters: &[Filter]) -> Result<Cursor>;

    /// Atomically update the first match, returning it as it was before the update
    fn find_one_and_update(&self, collection: &str, filters: &[Filter], update: &Update) -> Result<Option<Document>>;

    /// Update the first match; returns whether anything matched
    fn update_one(&self, collection: &str, filters: &[Filter], update: &Update) -> Result<bool>;

    /// Delete every match; an empty predicate wipes the collection
    fn delete_many(&self, collection: &str, filters: &[Filter]) -> Result<usize>;

    /// Names of non-empty collections with their document counts
    fn collections(&self) -> Result<Vec<(String, usize)>>;
}
