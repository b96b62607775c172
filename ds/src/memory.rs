//! In-process store used by tests and single-process runs

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::document::{Cursor, Document, ensure_id};
use crate::error::{Result, StoreError};
use crate::filter::{Filter, matches_all};
use crate::store::CoordinationStore;
use crate::update::Update;

/// Mutex-guarded map of collection name to documents in insertion order
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<Document>>>> {
        self.collections.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl CoordinationStore for MemoryStore {
    fn insert(&self, collection: &str, mut doc: Document) -> Result<String> {
        let id = ensure_id(&mut doc);
        debug!(%collection, %id, "MemoryStore::insert");
        self.lock()?.entry(collection.to_string()).or_default().push(doc);
        Ok(id)
    }

    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<String>> {
        debug!(%collection, count = docs.len(), "MemoryStore::insert_many");
        let mut guard = self.lock()?;
        let target = guard.entry(collection.to_string()).or_default();
        let mut ids = Vec::with_capacity(docs.len());
        for mut doc in docs {
            ids.push(ensure_id(&mut doc));
            target.push(doc);
        }
        Ok(ids)
    }

    fn find(&self, collection: &str, filters: &[Filter]) -> Result<Cursor> {
        let guard = self.lock()?;
        let docs = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches_all(filters, d)).cloned().collect())
            .unwrap_or_default();
        Ok(Cursor::new(docs))
    }

    fn find_one_and_update(&self, collection: &str, filters: &[Filter], update: &Update) -> Result<Option<Document>> {
        let mut guard = self.lock()?;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(None);
        };
        match docs.iter_mut().find(|d| matches_all(filters, d)) {
            Some(doc) => {
                let before = doc.clone();
                update.apply(doc);
                Ok(Some(before))
            }
            None => Ok(None),
        }
    }

    fn update_one(&self, collection: &str, filters: &[Filter], update: &Update) -> Result<bool> {
        Ok(self.find_one_and_update(collection, filters, update)?.is_some())
    }

    fn delete_many(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
        let mut guard = self.lock()?;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !matches_all(filters, d));
        let deleted = before - docs.len();
        debug!(%collection, deleted, "MemoryStore::delete_many");
        Ok(deleted)
    }

    fn collections(&self) -> Result<Vec<(String, usize)>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, docs)| (name.clone(), docs.len()))
            .collect())
    }
}
