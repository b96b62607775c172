//! SQLite-backed store shared between processes
//!
//! Every document lives in one `documents` table keyed by an autoincrement
//! sequence, which gives `find` its insertion order. Read-modify-write
//! operations run inside `BEGIN IMMEDIATE` transactions, so the write lock
//! is taken before the read and a claim is exclusive across processes.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, TransactionBehavior, params, params_from_iter};
use tracing::{debug, info};

use crate::document::{Cursor, Document, ensure_id};
use crate::error::{Result, StoreError};
use crate::filter::{Filter, FilterOp, IndexValue, matches_all};
use crate::store::CoordinationStore;
use crate::update::Update;

/// How long a writer waits on another process's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, seq);
CREATE INDEX IF NOT EXISTS idx_documents_id ON documents(collection, id);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "SqliteStore::open: called");
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        debug!(%mode, "SqliteStore::open: journal mode set");
        Self::init(conn).inspect(|_| info!(path = %path.display(), "Opened coordination store"))
    }

    /// Private database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Load matching documents with their sequence numbers
///
/// Equality filters on scalar values are pushed into SQL as a prefilter;
/// the full predicate is always re-checked in Rust.
fn load(conn: &Connection, collection: &str, filters: &[Filter]) -> Result<Vec<(i64, Document)>> {
    let mut sql = String::from("SELECT seq, body FROM documents WHERE collection = ?");
    let mut args = vec![SqlValue::Text(collection.to_string())];

    for filter in filters.iter().filter(|f| f.op == FilterOp::Eq) {
        let arg = match &filter.value {
            IndexValue::String(s) => SqlValue::Text(s.clone()),
            IndexValue::Int(i) => SqlValue::Integer(*i),
            _ => continue,
        };
        sql.push_str(" AND json_extract(body, ?) = ?");
        args.push(SqlValue::Text(json_path(&filter.field)));
        args.push(arg);
    }
    sql.push_str(" ORDER BY seq");

    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params_from_iter(args), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut docs = Vec::new();
    for row in rows {
        let (seq, body) = row?;
        let doc: Document = serde_json::from_str(&body)?;
        if matches_all(filters, &doc) {
            docs.push((seq, doc));
        }
    }
    Ok(docs)
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

fn insert_row(conn: &Connection, collection: &str, mut doc: Document) -> Result<String> {
    let id = ensure_id(&mut doc);
    let body = serde_json::to_string(&doc)?;
    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
        params![collection, id, body],
    )?;
    Ok(id)
}

impl CoordinationStore for SqliteStore {
    fn insert(&self, collection: &str, doc: Document) -> Result<String> {
        let conn = self.lock()?;
        let id = insert_row(&conn, collection, doc)?;
        debug!(%collection, %id, "SqliteStore::insert");
        Ok(id)
    }

    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<String>> {
        debug!(%collection, count = docs.len(), "SqliteStore::insert_many");
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            ids.push(insert_row(&tx, collection, doc)?);
        }
        tx.commit()?;
        Ok(ids)
    }

    fn find(&self, collection: &str, filters: &[Filter]) -> Result<Cursor> {
        let conn = self.lock()?;
        let docs = load(&conn, collection, filters)?.into_iter().map(|(_, doc)| doc).collect();
        Ok(Cursor::new(docs))
    }

    fn find_one_and_update(&self, collection: &str, filters: &[Filter], update: &Update) -> Result<Option<Document>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some((seq, before)) = load(&tx, collection, filters)?.into_iter().next() else {
            return Ok(None);
        };

        let mut after = before.clone();
        update.apply(&mut after);
        tx.execute(
            "UPDATE documents SET body = ?1 WHERE seq = ?2",
            params![serde_json::to_string(&after)?, seq],
        )?;
        tx.commit()?;
        Ok(Some(before))
    }

    fn update_one(&self, collection: &str, filters: &[Filter], update: &Update) -> Result<bool> {
        Ok(self.find_one_and_update(collection, filters, update)?.is_some())
    }

    fn delete_many(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
        let mut conn = self.lock()?;
        if filters.is_empty() {
            let deleted = conn.execute("DELETE FROM documents WHERE collection = ?1", params![collection])?;
            debug!(%collection, deleted, "SqliteStore::delete_many: wiped collection");
            return Ok(deleted);
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let matched = load(&tx, collection, filters)?;
        for (seq, _) in &matched {
            tx.execute("DELETE FROM documents WHERE seq = ?1", params![seq])?;
        }
        tx.commit()?;
        debug!(%collection, deleted = matched.len(), "SqliteStore::delete_many");
        Ok(matched.len())
    }

    fn collections(&self) -> Result<Vec<(String, usize)>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
