//! DocStore - shared document store for cross-process coordination
//!
//! Processes that never talk to each other directly coordinate through a
//! single store: they insert documents, query them with simple predicates,
//! and claim work with an atomic find-and-update.
//!
//! # Architecture
//!
//! ```text
//! CoordinationStore (trait)
//! ├── MemoryStore   # mutex-guarded map, tests and single-process runs
//! └── SqliteStore   # one database file shared by every process of a run
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docstore::{CoordinationStore, Filter, SqliteStore, Update};
//!
//! let store = SqliteStore::open("run.db")?;
//! let claimed = store.find_one_and_update(
//!     "jobs",
//!     &[Filter::eq("status", "unassigned")],
//!     &Update::new().set("status", "pending"),
//! )?;
//! ```

mod document;
mod error;
mod filter;
mod memory;
mod record;
mod sqlite;
mod store;
mod update;

pub use document::{Cursor, Document, ID_FIELD, document_id, ensure_id};
pub use error::{Result, StoreError};
pub use filter::{Filter, FilterOp, IndexValue, matches_all};
pub use memory::MemoryStore;
pub use record::Record;
pub use sqlite::SqliteStore;
pub use store::CoordinationStore;
pub use update::Update;

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
